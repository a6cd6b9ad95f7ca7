use tally_core::aggregate::GridAggregate;
use tally_core::calculation::CalculationOutcome;
use tally_core::pointer::catalog::PointerCatalog;
use tally_core::pointer::Pointer;
use tally_core::report::ReportLine;

pub fn print_report(name: &str, lines: &[ReportLine]) {
    println!("=== {name} ===\n");

    let width = lines.iter().map(|l| l.name.chars().count()).max().unwrap_or(10);
    for line in lines {
        println!(
            "  {:<width$}  {} {}",
            line.name,
            line.result,
            line.unit,
            width = width
        );
        for reason in &line.reasons {
            println!("    {reason}");
        }
    }
    println!();

    let failed = lines.iter().filter(|l| l.result.is_error()).count();
    if failed > 0 {
        eprintln!("{failed} of {} calculation(s) could not be evaluated", lines.len());
    }
}

pub fn print_outcome(unique_id: &str, outcome: &CalculationOutcome, trace: bool) {
    println!("  {unique_id} = {}", outcome.value);
    println!("  expression: {}", outcome.expression);

    if !outcome.reasons.is_empty() {
        println!("\n  Reasons:");
        for reason in &outcome.reasons {
            println!("    {reason}");
        }
    }

    if trace {
        println!("\n  Trace:");
        for (i, step) in outcome.steps.iter().enumerate() {
            println!("    {:>2}. {}", i + 1, step.message);
        }
    }
    println!();
}

pub fn print_grid(grid: &GridAggregate) {
    println!("=== {} ({}) ===\n", grid.material_name, grid.material_unique_id);

    if grid.entries.is_empty() {
        println!("  No numeric columns.\n");
        return;
    }

    let row_width = grid
        .entries
        .iter()
        .map(|e| e.row_name.chars().count())
        .max()
        .unwrap_or(8);
    let col_width = grid
        .entries
        .iter()
        .map(|e| e.col_name.chars().count())
        .max()
        .unwrap_or(8);

    for entry in &grid.entries {
        println!(
            "  {:<rw$}  {:<cw$}  {} {}",
            entry.row_name,
            entry.col_name,
            entry.value,
            entry.unit,
            rw = row_width,
            cw = col_width
        );
    }
    println!();
}

pub fn print_catalog(catalog: &PointerCatalog) {
    for material in &catalog.materials {
        println!(
            "=== {} ({}) ===\n",
            material.material_name, material.material_unique_id
        );
        print_pointers("sum", &material.sum);
        print_pointers("countif", &material.countif);
    }

    if !catalog.constants.is_empty() {
        println!("=== Constants ===\n");
        print_pointers("constant", &catalog.constants);
    }
    if !catalog.calculations.is_empty() {
        println!("=== Calculations ===\n");
        print_pointers("calculation", &catalog.calculations);
    }
}

fn print_pointers(label: &str, pointers: &[Pointer]) {
    if pointers.is_empty() {
        return;
    }
    println!("  {label} ({}):", pointers.len());
    for pointer in pointers {
        println!("    {}", pointer.text());
    }
    println!();
}
