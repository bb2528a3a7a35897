//! cellforge CLI - formula evaluation and workbook inspection tool

use anyhow::{bail, Context, Result};
use cellforge::prelude::*;
use cellforge::{evaluate, evaluate_at};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cellforge")]
#[command(
    author,
    version,
    about = "Evaluate spreadsheet formulas and inspect XLSX workbooks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula, optionally against a sheet of a workbook
    Eval {
        /// Formula text, with or without the leading '='
        formula: String,

        /// Workbook whose cells the formula may reference
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Sheet name (default: first sheet)
        #[arg(short, long, requires = "file")]
        sheet: Option<String>,
    },

    /// Show information about a workbook
    Info {
        /// Input workbook
        input: PathBuf,
    },

    /// List all sheets in a workbook
    Sheets {
        /// Input workbook
        input: PathBuf,
    },

    /// Recalculate every formula and write the result to a new file
    Calc {
        /// Input workbook
        input: PathBuf,

        /// Output workbook
        output: PathBuf,

        /// Keep previous cached values for formulas that evaluate to an error
        #[arg(long)]
        keep_errors: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            formula,
            file,
            sheet,
        } => eval(&formula, file.as_deref(), sheet.as_deref()),
        Commands::Info { input } => show_info(&input),
        Commands::Sheets { input } => list_sheets(&input),
        Commands::Calc {
            input,
            output,
            keep_errors,
        } => calc(&input, &output, keep_errors),
    }
}

fn open(path: &Path) -> Result<Workbook> {
    Workbook::open(path).with_context(|| format!("Failed to open '{}'", path.display()))
}

fn eval(formula: &str, file: Option<&Path>, sheet: Option<&str>) -> Result<()> {
    let result = match file {
        None => evaluate(formula).map_err(Error::from),
        Some(path) => {
            let workbook = open(path)?;
            let worksheet = match sheet {
                Some(name) => workbook
                    .worksheet_by_name(name)
                    .with_context(|| format!("Sheet '{}' not found", name))?,
                None => workbook.worksheet(0).context("Workbook has no sheets")?,
            };
            evaluate_at(worksheet, formula, None)
        }
    };

    match result {
        Ok(value) => println!("{}", value),
        // Excel errors are results, not failures of the tool
        Err(Error::Formula(e)) => println!("{}", e),
        Err(e) => return Err(e).context("Failed to evaluate formula"),
    }
    Ok(())
}

fn show_info(input: &Path) -> Result<()> {
    let workbook = open(input)?;

    println!("File: {}", input.display());
    if let Some(title) = &workbook.properties().title {
        println!("Title: {}", title);
    }
    println!("Sheets: {}", workbook.sheet_count());

    for (i, sheet) in workbook.worksheets().enumerate() {
        let formula_count = sheet
            .iter_cells()
            .filter(|(_, data)| data.value.is_formula())
            .count();

        println!();
        println!("  Sheet {}: \"{}\"", i, sheet.name());
        match sheet.used_range() {
            Some(range) => println!(
                "    Used range: {} ({} rows x {} columns)",
                range,
                range.row_count(),
                range.col_count()
            ),
            None => println!("    Used range: empty"),
        }
        println!("    Cells: {}", sheet.cell_count());
        println!("    Formulas: {}", formula_count);
        println!("    Merged regions: {}", sheet.merged_regions().len());
        println!("    Hyperlinks: {}", sheet.hyperlinks().count());
        println!("    Images: {}", sheet.images().len());
    }

    Ok(())
}

fn list_sheets(input: &Path) -> Result<()> {
    let workbook = open(input)?;

    for (i, name) in workbook.sheet_names().into_iter().enumerate() {
        println!("{}\t{}", i, name);
    }

    Ok(())
}

fn calc(input: &Path, output: &Path, keep_errors: bool) -> Result<()> {
    if input == output {
        bail!("Refusing to overwrite the input file '{}'", input.display());
    }

    let mut workbook = open(input)?;
    let options = CalculationOptions::new().with_store_errors(!keep_errors);
    let stats = workbook.calculate_with_options(&options);

    eprintln!(
        "Calculated {} of {} formulas ({} errors, {} circular)",
        stats.cells_calculated, stats.formula_count, stats.errors, stats.circular_references
    );

    workbook
        .save(output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    eprintln!("Wrote '{}'", output.display());

    Ok(())
}
