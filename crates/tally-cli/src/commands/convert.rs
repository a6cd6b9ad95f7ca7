use std::path::Path;
use tally_core::error::TallyError;
use tally_core::model::parse_decimal;
use tally_core::store::load_dataset;
use tally_core::units::UnitConverter;

pub fn run(data: &Path, value: &str, from: &str, to: &str) -> Result<(), TallyError> {
    let value = parse_decimal(value)
        .ok_or_else(|| TallyError::Validation(format!("'{value}' is not a number")))?;
    let store = load_dataset(data)?;
    let ctx = store.context();

    let converted = UnitConverter::new(ctx.units).convert(value, from, to)?;
    println!("{value} {from} = {converted} {to}");

    Ok(())
}
