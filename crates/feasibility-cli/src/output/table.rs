use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_envelope(result, map),
            None => print_fields(map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_envelope(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res) if res.contains_key("matrix") => print_matrix(res),
        Value::Object(res) => print_result(res),
        other => println!("{}", format_value(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalar fields first, then one row per period, then nested records.
fn print_result(res: &Map<String, Value>) {
    let scalars: Map<String, Value> = res
        .iter()
        .filter(|(_, v)| !v.is_array())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !scalars.is_empty() {
        print_fields(&scalars);
    }

    if let Some(Value::Array(years)) = res.get("years") {
        print_periods(years, res);
    }

    for (key, val) in res {
        if let Value::Array(items) = val {
            if items.first().is_some_and(Value::is_object) {
                println!("\n{}:", key);
                print_array_table(items);
            }
        }
    }
}

/// Year-by-year view of every series aligned with `years`.
fn print_periods(years: &[Value], res: &Map<String, Value>) {
    let series: Vec<(&String, &Vec<Value>)> = res
        .iter()
        .filter_map(|(k, v)| match v {
            Value::Array(items) if k != "years" && items.len() == years.len() => Some((k, items)),
            _ => None,
        })
        .filter(|(_, items)| items.iter().all(|i| !i.is_object()))
        .collect();
    if series.is_empty() {
        return;
    }

    let mut builder = Builder::default();
    let mut header = vec!["year".to_string()];
    header.extend(series.iter().map(|(k, _)| k.to_string()));
    builder.push_record(header);

    for (i, year) in years.iter().enumerate() {
        let mut row = vec![format_value(year)];
        row.extend(series.iter().map(|(_, items)| format_value(&items[i])));
        builder.push_record(row);
    }
    println!("\n{}", Table::from(builder));
}

/// Sensitivity grid: variable_1 down the side, variable_2 across the top.
fn print_matrix(res: &Map<String, Value>) {
    let name_1 = res.get("variable_1_name").and_then(Value::as_str).unwrap_or("var1");
    let name_2 = res.get("variable_2_name").and_then(Value::as_str).unwrap_or("var2");
    let empty = Vec::new();
    let rows = res.get("variable_1_values").and_then(Value::as_array).unwrap_or(&empty);
    let cols = res.get("variable_2_values").and_then(Value::as_array).unwrap_or(&empty);
    let matrix = res.get("matrix").and_then(Value::as_array).unwrap_or(&empty);

    let mut builder = Builder::default();
    let mut header = vec![format!("{name_1} \\ {name_2} (%)")];
    header.extend(cols.iter().map(format_value));
    builder.push_record(header);

    for (label, row) in rows.iter().zip(matrix) {
        let mut record = vec![format_value(label)];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(|c| match c {
                Value::Null => "n/a".to_string(),
                other => format_value(other),
            }));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));

    if let Some(base) = res.get("base_case_value") {
        println!("\nBase case IRR: {}", format_value(base));
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }
        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
