//! Example: Create a styled xlsx file with formulas

use cellforge::prelude::*;
use cellforge::CoreError;

fn main() -> Result<()> {
    let mut workbook = Workbook::new();
    workbook.rename_worksheet(0, "Budget")?;
    let sheet = workbook
        .worksheet_mut(0)
        .ok_or_else(|| Error::Core(CoreError::other("workbook has no sheets")))?;

    let header = Style::new()
        .bold(true)
        .fill_color("#DDEBF7")
        .border_all(BorderLineStyle::Thin, "black");

    // Header row
    for (addr, label) in [("A1", "Item"), ("B1", "Cost"), ("C1", "With tax")] {
        sheet.set_cell_value(addr, label)?;
        sheet.set_cell_style(addr, &header)?;
    }
    sheet.set_column_width(1, 18.0);

    // Data rows
    let money = Style::new().number_format("#,##0.00");
    for (row, (item, cost)) in [("Rent", 1200.0), ("Power", 85.5), ("Internet", 40.0)]
        .into_iter()
        .enumerate()
    {
        let row = row as u32 + 2;
        sheet.set_cell_value_at(row, 1, item)?;
        sheet.set_cell_value_at(row, 2, cost)?;
        sheet.set_cell_formula_at(row, 3, &format!("=ROUND(B{}*1.2,2)", row))?;
        sheet.set_cell_style_at(row, 3, &money)?;
    }

    // Total row
    sheet.set_cell_value("A5", "Total")?;
    sheet.set_cell_formula("B5", "=SUM(B2:B4)")?;
    sheet.set_cell_formula("C5", "=SUM(C2:C4)")?;
    sheet.set_hyperlink("A7", "https://example.com/budget")?;
    sheet.set_cell_value("A7", "Budget guidelines")?;

    let stats = workbook.calculate();
    println!(
        "Calculated {} formulas ({} errors)",
        stats.cells_calculated, stats.errors
    );

    let path = std::env::temp_dir().join("cellforge-budget.xlsx");
    workbook.save(&path)?;
    println!("Created {}", path.display());

    Ok(())
}
