use serde_json::{Map, Value};
use std::io;

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Series results (anything with `years`) become one row per period and
/// sensitivity grids become a matrix; everything else is `field,value`.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) if map.contains_key("matrix") => write_matrix(&mut wtr, map),
        Value::Object(map) if map.contains_key("years") => write_periods(&mut wtr, map),
        Value::Object(map) => {
            if let Some(Value::Array(records)) = map.get("results").or_else(|| map.get("bars")) {
                write_array_csv(&mut wtr, records);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([&format_csv_value(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_periods(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let empty = Vec::new();
    let years = map.get("years").and_then(Value::as_array).unwrap_or(&empty);
    let series: Vec<(&String, &Vec<Value>)> = map
        .iter()
        .filter_map(|(k, v)| match v {
            Value::Array(items) if k != "years" && items.len() == years.len() => Some((k, items)),
            _ => None,
        })
        .collect();

    let mut header = vec!["year".to_string()];
    header.extend(series.iter().map(|(k, _)| k.to_string()));
    let _ = wtr.write_record(&header);

    for (i, year) in years.iter().enumerate() {
        let mut row = vec![format_csv_value(year)];
        row.extend(series.iter().map(|(_, items)| format_csv_value(&items[i])));
        let _ = wtr.write_record(&row);
    }
}

fn write_matrix(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let empty = Vec::new();
    let rows = map.get("variable_1_values").and_then(Value::as_array).unwrap_or(&empty);
    let cols = map.get("variable_2_values").and_then(Value::as_array).unwrap_or(&empty);
    let matrix = map.get("matrix").and_then(Value::as_array).unwrap_or(&empty);
    let corner = format!(
        "{}\\{}",
        map.get("variable_1_name").and_then(Value::as_str).unwrap_or(""),
        map.get("variable_2_name").and_then(Value::as_str).unwrap_or("")
    );

    let mut header = vec![corner];
    header.extend(cols.iter().map(format_csv_value));
    let _ = wtr.write_record(&header);

    for (label, row) in rows.iter().zip(matrix) {
        let mut record = vec![format_csv_value(label)];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
