pub mod extract;
pub mod irr;
pub mod scenario;
pub mod sensitivity;

use clap::Args;
use std::sync::Arc;

use feasibility_core::extraction::{self, WorkbookLayout};
use feasibility_core::scenarios::ScenarioAssumptions;
use feasibility_core::{BaseFinancialModel, ComputationOutput, ProjectEngine};

use crate::input;

/// Where the base model comes from
#[derive(Args)]
pub struct WorkbookArgs {
    /// Feasibility workbook (.xlsx/.xls/.ods) or a JSON sheet dump
    #[arg(long, short = 'w')]
    pub workbook: String,

    /// Sheet names, coordinates and row keywords (JSON or YAML)
    #[arg(long)]
    pub layout: Option<String>,
}

impl WorkbookArgs {
    pub fn load(&self) -> Result<ComputationOutput<BaseFinancialModel>, Box<dyn std::error::Error>> {
        let layout: WorkbookLayout = match self.layout {
            Some(ref path) => input::file::read_config(path)?,
            None => WorkbookLayout::default(),
        };
        let path = input::file::workbook_path(&self.workbook)?;
        Ok(extraction::extract_file(&path, &layout)?)
    }
}

/// A loaded project plus the scenario constants to run it with
#[derive(Args)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub source: WorkbookArgs,

    /// Tax rate, reference unit price/cost and slider bounds (JSON or YAML)
    #[arg(long)]
    pub assumptions: Option<String>,
}

impl ProjectArgs {
    pub fn engine(&self) -> Result<ProjectEngine, Box<dyn std::error::Error>> {
        let extracted = self.source.load()?;
        let engine = ProjectEngine::new(Arc::new(extracted.result))?;
        match self.assumptions {
            Some(ref path) => {
                let assumptions: ScenarioAssumptions = input::file::read_config(path)?;
                Ok(engine.with_assumptions(assumptions)?)
            }
            None => Ok(engine),
        }
    }
}
