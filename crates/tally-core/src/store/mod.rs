//! In-memory document store backing every engine collaborator.

pub mod versions;

use crate::aggregate::scoped::compile_pattern;
use crate::calculation::expr::is_literal_token;
use crate::calculation::schema::{Calculation, CalculationDraft};
use crate::error::TallyError;
use crate::model::{Company, Constant, Form, Material, Meter, UnitEdge};
use crate::pointer::{AggregateMethod, Pointer};
use crate::provider::{
    CalculationProvider, CompanyProvider, ConstantProvider, ContentProvider, EngineContext,
    FormProvider, MaterialProvider, MeterProvider, ReportProvider, UnitProvider,
};
use crate::report::Report;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use versions::VersionChain;

/// Serialized form of a store, as read from and written to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub forms: Vec<Form>,
    #[serde(default)]
    pub meters: Vec<Meter>,
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub constants: Vec<Constant>,
    #[serde(default)]
    pub units: Vec<UnitEdge>,
    #[serde(default)]
    pub calculations: Vec<Calculation>,
    #[serde(default)]
    pub reports: Vec<Report>,
    /// Locale -> custom-field translations.
    #[serde(default)]
    pub contents: BTreeMap<String, BTreeMap<String, String>>,
}

/// Load a dataset file into a store.
pub fn load_dataset(path: &Path) -> Result<MemoryStore, TallyError> {
    let content = std::fs::read_to_string(path).map_err(|e| TallyError::DatasetLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let dataset: Dataset = serde_json::from_str(&content).map_err(|e| TallyError::DatasetLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    MemoryStore::from_dataset(dataset)
}

/// Parse a dataset from a JSON string.
pub fn parse_dataset(json: &str) -> Result<MemoryStore, TallyError> {
    let dataset: Dataset = serde_json::from_str(json)?;
    MemoryStore::from_dataset(dataset)
}

/// Write a store back to a dataset file.
pub fn save_dataset(store: &MemoryStore, path: &Path) -> Result<(), TallyError> {
    let json = serde_json::to_string_pretty(&store.to_dataset())?;
    std::fs::write(path, json)?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    materials: BTreeMap<String, VersionChain<Material>>,
    forms: Vec<Form>,
    meters: Vec<Meter>,
    companies: BTreeMap<String, Company>,
    constants: Vec<Constant>,
    units: Vec<UnitEdge>,
    calculations: BTreeMap<String, VersionChain<Calculation>>,
    reports: BTreeMap<String, Report>,
    contents: BTreeMap<String, BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn from_dataset(dataset: Dataset) -> Result<Self, TallyError> {
        let mut store = MemoryStore {
            materials: build_chains(dataset.materials)?,
            forms: dataset.forms,
            meters: dataset.meters,
            companies: dataset
                .companies
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            constants: dataset.constants,
            units: dataset.units,
            calculations: build_chains(dataset.calculations)?,
            reports: BTreeMap::new(),
            contents: dataset.contents,
        };
        for report in dataset.reports {
            store.upsert_report(report);
        }

        debug!(
            materials = store.materials.len(),
            forms = store.forms.len(),
            meters = store.meters.len(),
            calculations = store.calculations.len(),
            reports = store.reports.len(),
            "loaded dataset"
        );
        Ok(store)
    }

    pub fn to_dataset(&self) -> Dataset {
        Dataset {
            materials: self.materials.values().flat_map(VersionChain::records).collect(),
            forms: self.forms.clone(),
            meters: self.meters.clone(),
            companies: self.companies.values().cloned().collect(),
            constants: self.constants.clone(),
            units: self.units.clone(),
            calculations: self
                .calculations
                .values()
                .flat_map(VersionChain::records)
                .collect(),
            reports: self.reports.values().cloned().collect(),
            contents: self.contents.clone(),
        }
    }

    pub fn context(&self) -> EngineContext<'_> {
        EngineContext::from_store(self)
    }

    /// Every stored version of a calculation, oldest first.
    pub fn calculation_history(&self, unique_id: &str) -> Option<&[Calculation]> {
        self.calculations.get(unique_id).map(VersionChain::versions)
    }

    pub fn create_calculation(&mut self, draft: CalculationDraft) -> Result<&Calculation, TallyError> {
        if self.calculations.contains_key(&draft.unique_id) {
            return Err(TallyError::Validation(format!(
                "calculation unique id '{}' already exists",
                draft.unique_id
            )));
        }
        self.validate_expression(&draft.unique_id, &draft.expression)?;

        let unique_id = draft.unique_id.clone();
        let chain = self
            .calculations
            .entry(unique_id)
            .or_insert_with(|| VersionChain::new(draft.into_version(1)));
        Ok(chain.head())
    }

    /// Store an edit as the next version of an existing calculation.
    pub fn update_calculation(&mut self, draft: CalculationDraft) -> Result<&Calculation, TallyError> {
        if !self.calculations.contains_key(&draft.unique_id) {
            return Err(TallyError::CalculationNotFound(draft.unique_id));
        }
        self.validate_expression(&draft.unique_id, &draft.expression)?;

        let chain = self
            .calculations
            .get_mut(&draft.unique_id)
            .ok_or_else(|| TallyError::CalculationNotFound(draft.unique_id.clone()))?;
        Ok(chain.append(draft.into_version(0)))
    }

    /// Check an expression against the materials it references.
    pub fn validate_expression(&self, unique_id: &str, expression: &[Pointer]) -> Result<(), TallyError> {
        let ctx = self.context();
        for pointer in expression {
            if let Some((method, target)) = pointer.as_aggregate() {
                let material =
                    ctx.resolve_material(target.material_id.as_deref(), &target.material_unique_id)?;
                target.scope(material.matrix()?)?;
                if method == AggregateMethod::Countif {
                    compile_pattern(&target.payload.search)?;
                }
                continue;
            }

            match pointer {
                Pointer::Number(token) | Pointer::Operator(token) => {
                    if !is_literal_token(&token.text) {
                        return Err(TallyError::Validation(format!(
                            "'{}' is not a number or operator",
                            token.text
                        )));
                    }
                }
                Pointer::Calculation(target) => {
                    if target.calculation_unique_id == unique_id {
                        return Err(TallyError::Validation(format!(
                            "calculation '{unique_id}' references itself"
                        )));
                    }
                }
                Pointer::Constant(_) | Pointer::Sum(_) | Pointer::Countif(_) => {}
            }
        }
        Ok(())
    }

    /// Problems with stored calculations, one message per offending version.
    pub fn calculation_warnings(&self) -> Vec<String> {
        self.calculations
            .values()
            .map(VersionChain::head)
            .filter_map(|calc| {
                self.validate_expression(&calc.unique_id, &calc.expression)
                    .err()
                    .map(|e| format!("calculation '{}' (v{}): {}", calc.unique_id, calc.version, e))
            })
            .collect()
    }

    pub fn create_material(&mut self, material: Material) -> Result<&Material, TallyError> {
        if self.materials.contains_key(&material.unique_id) {
            return Err(TallyError::Validation(format!(
                "material unique id '{}' already exists",
                material.unique_id
            )));
        }
        self.ensure_new_material_id(&material.id)?;
        let chain = self
            .materials
            .entry(material.unique_id.clone())
            .or_insert_with(|| VersionChain::new(material));
        Ok(chain.head())
    }

    pub fn update_material(&mut self, material: Material) -> Result<&Material, TallyError> {
        if !self.materials.contains_key(&material.unique_id) {
            return Err(TallyError::MaterialNotFound(material.unique_id));
        }
        self.ensure_new_material_id(&material.id)?;
        let chain = self
            .materials
            .get_mut(&material.unique_id)
            .ok_or_else(|| TallyError::MaterialNotFound(material.unique_id.clone()))?;
        Ok(chain.append(material))
    }

    /// Remove every version of a material no form refers to.
    pub fn delete_material(&mut self, unique_id: &str) -> Result<(), TallyError> {
        if let Some(form) = self.forms.iter().find(|f| f.position_of(unique_id).is_some()) {
            return Err(TallyError::Validation(format!(
                "material '{}' is still used by form '{}'",
                unique_id, form.id
            )));
        }
        self.materials
            .remove(unique_id)
            .map(|_| ())
            .ok_or_else(|| TallyError::MaterialNotFound(unique_id.to_string()))
    }

    fn ensure_new_material_id(&self, id: &str) -> Result<(), TallyError> {
        let taken = self
            .materials
            .values()
            .flat_map(|c| c.versions())
            .any(|m| m.id == id);
        if taken {
            return Err(TallyError::Validation(format!(
                "material id '{id}' already exists"
            )));
        }
        Ok(())
    }

    /// Insert a report, replacing the calculation list of a same-named one.
    /// Returns true when an existing report was replaced.
    pub fn upsert_report(&mut self, report: Report) -> bool {
        self.reports.insert(report.name.clone(), report).is_some()
    }
}

fn build_chains<T: versions::Versioned>(
    records: Vec<T>,
) -> Result<BTreeMap<String, VersionChain<T>>, TallyError> {
    let mut grouped: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.unique_id().to_string())
            .or_default()
            .push(record);
    }
    grouped
        .into_iter()
        .map(|(id, rows)| Ok((id, VersionChain::from_records(rows)?)))
        .collect()
}

impl MaterialProvider for MemoryStore {
    fn material_by_id(&self, id: &str) -> Result<Option<Material>, TallyError> {
        Ok(self
            .materials
            .values()
            .flat_map(|c| c.versions())
            .find(|m| m.id == id)
            .cloned())
    }

    fn latest_material(&self, unique_id: &str) -> Result<Option<Material>, TallyError> {
        Ok(self.materials.get(unique_id).map(|c| c.head().clone()))
    }

    fn latest_materials(&self) -> Result<Vec<Material>, TallyError> {
        Ok(self.materials.values().map(|c| c.head().clone()).collect())
    }
}

impl FormProvider for MemoryStore {
    fn forms_for(&self, company_id: &str, financial_year: &str) -> Result<Vec<Form>, TallyError> {
        Ok(self
            .forms
            .iter()
            .filter(|f| f.company_id == company_id && f.financial_year == financial_year)
            .cloned()
            .collect())
    }
}

impl MeterProvider for MemoryStore {
    fn meters_for_form(&self, form_id: &str) -> Result<Vec<Meter>, TallyError> {
        Ok(self
            .meters
            .iter()
            .filter(|m| m.form_id == form_id)
            .cloned()
            .collect())
    }
}

impl CompanyProvider for MemoryStore {
    fn company(&self, company_id: &str) -> Result<Option<Company>, TallyError> {
        Ok(self.companies.get(company_id).cloned())
    }
}

impl ConstantProvider for MemoryStore {
    fn find_by_unique_id(&self, unique_id: &str) -> Result<Vec<Constant>, TallyError> {
        Ok(self
            .constants
            .iter()
            .filter(|c| c.unique_id == unique_id)
            .cloned()
            .collect())
    }

    fn constants(&self) -> Result<Vec<Constant>, TallyError> {
        Ok(self.constants.clone())
    }
}

impl UnitProvider for MemoryStore {
    fn find_matching_edges(&self, unit: &str) -> Result<Vec<UnitEdge>, TallyError> {
        Ok(self
            .units
            .iter()
            .filter(|e| e.input == unit || e.output == unit)
            .cloned()
            .collect())
    }
}

impl CalculationProvider for MemoryStore {
    fn latest_calculation(&self, unique_id: &str) -> Result<Option<Calculation>, TallyError> {
        Ok(self.calculations.get(unique_id).map(|c| c.head().clone()))
    }

    fn latest_calculations(&self) -> Result<Vec<Calculation>, TallyError> {
        Ok(self.calculations.values().map(|c| c.head().clone()).collect())
    }
}

impl ReportProvider for MemoryStore {
    fn report(&self, name: &str) -> Result<Option<Report>, TallyError> {
        Ok(self.reports.get(name).cloned())
    }
}

impl ContentProvider for MemoryStore {
    fn custom_fields(&self, locale: &str) -> Result<Option<BTreeMap<String, String>>, TallyError> {
        Ok(self.contents.get(locale).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::{AggregatePointer, Payload};

    const DATASET: &str = r#"{
        "materials": [
            { "id": "gas-v1", "uniqueId": "gas", "name": "Gas", "version": 1, "latest": false,
              "type": "matrix", "rows": [{ "name": "shop 1" }],
              "columns": [{ "name": "volume", "inputType": "number", "outputUnit": "L" }] },
            { "id": "gas-v2", "uniqueId": "gas", "name": "Gas", "version": 2, "latest": true,
              "type": "matrix", "rows": [{ "name": "shop 1" }, { "name": "shop 2" }],
              "columns": [{ "name": "volume", "inputType": "number", "outputUnit": "L" }] }
        ],
        "forms": [
            { "id": "f1", "companyId": "c1", "financialYear": "2023-12-31",
              "materials": [{ "id": "gas-v2", "uniqueId": "gas" }] }
        ],
        "companies": [{ "id": "c1", "location": "HK" }],
        "reports": [
            { "name": "Annual", "calculations": ["a"] },
            { "name": "Annual", "calculations": ["b"] }
        ]
    }"#;

    fn draft(unique_id: &str, expression: Vec<Pointer>) -> CalculationDraft {
        CalculationDraft {
            name: format!("calc {unique_id}"),
            unique_id: unique_id.into(),
            unit: "L".into(),
            expression,
        }
    }

    fn sum_pointer(row: i64, col: i64) -> Pointer {
        Pointer::Sum(AggregatePointer {
            text: "sum".into(),
            material_id: None,
            material_unique_id: "gas".into(),
            row,
            col,
            payload: Payload::default(),
        })
    }

    #[test]
    fn test_material_versions_resolve() {
        let store = parse_dataset(DATASET).unwrap();
        let v1 = store.material_by_id("gas-v1").unwrap().unwrap();
        assert_eq!(v1.version, 1);
        let latest = store.latest_material("gas").unwrap().unwrap();
        assert_eq!(latest.id, "gas-v2");
    }

    #[test]
    fn test_reports_upsert_by_name() {
        let store = parse_dataset(DATASET).unwrap();
        let report = store.report("Annual").unwrap().unwrap();
        assert_eq!(report.calculations, vec!["b"]);
        assert_eq!(store.to_dataset().reports.len(), 1);
    }

    #[test]
    fn test_upsert_report_replaces() {
        let mut store = MemoryStore::default();
        let first = Report { name: "R".into(), calculations: vec!["a".into()] };
        let second = Report { name: "R".into(), calculations: vec!["a".into(), "b".into()] };
        assert!(!store.upsert_report(first));
        assert!(store.upsert_report(second));
        assert_eq!(store.report("R").unwrap().unwrap().calculations.len(), 2);
    }

    #[test]
    fn test_create_and_update_calculation() {
        let mut store = parse_dataset(DATASET).unwrap();
        store
            .create_calculation(draft("a", vec![sum_pointer(1, 0), Pointer::operator("*"), Pointer::number("5")]))
            .unwrap();
        let updated = store
            .update_calculation(draft("a", vec![sum_pointer(0, -1)]))
            .unwrap();
        assert_eq!(updated.version, 2);

        let history = store.calculation_history("a").unwrap();
        assert_eq!(history.len(), 2);
        let records = store.to_dataset().calculations;
        assert_eq!(records.iter().filter(|c| c.latest).count(), 1);
        assert_eq!(store.latest_calculation("a").unwrap().unwrap().version, 2);
    }

    #[test]
    fn test_duplicate_unique_id_rejected() {
        let mut store = parse_dataset(DATASET).unwrap();
        store.create_calculation(draft("a", vec![Pointer::number("1")])).unwrap();
        let err = store.create_calculation(draft("a", vec![Pointer::number("2")])).unwrap_err();
        assert!(matches!(err, TallyError::Validation(_)));
    }

    #[test]
    fn test_update_missing_calculation() {
        let mut store = parse_dataset(DATASET).unwrap();
        let err = store.update_calculation(draft("nope", vec![Pointer::number("1")])).unwrap_err();
        assert!(matches!(err, TallyError::CalculationNotFound(_)));
    }

    #[test]
    fn test_expression_validation() {
        let mut store = parse_dataset(DATASET).unwrap();
        let out_of_bounds = store.create_calculation(draft("x", vec![sum_pointer(2, 0)]));
        assert!(matches!(out_of_bounds, Err(TallyError::PointerOutOfBounds { .. })));

        let bad_literal = store.create_calculation(draft("y", vec![Pointer::number("abc")]));
        assert!(matches!(bad_literal, Err(TallyError::Validation(_))));

        let self_ref = store.create_calculation(draft("z", vec![Pointer::calculation("z")]));
        assert!(matches!(self_ref, Err(TallyError::Validation(_))));
    }

    #[test]
    fn test_pointer_bounds_follow_material_version() {
        let mut store = parse_dataset(DATASET).unwrap();
        // Row 1 exists only in v2.
        let mut pointer = sum_pointer(1, 0);
        if let Pointer::Sum(p) = &mut pointer {
            p.material_id = Some("gas-v1".into());
        }
        let err = store.create_calculation(draft("old", vec![pointer])).unwrap_err();
        assert!(matches!(err, TallyError::PointerOutOfBounds { .. }));
    }

    #[test]
    fn test_material_id_must_match_unique_id() {
        let mut store = parse_dataset(DATASET).unwrap();
        let mut pointer = sum_pointer(0, 0);
        if let Pointer::Sum(p) = &mut pointer {
            p.material_id = Some("gas-v1".into());
            p.material_unique_id = "water".into();
        }
        let err = store.create_calculation(draft("mixed", vec![pointer])).unwrap_err();
        assert!(matches!(err, TallyError::MaterialNotFound(_)));
    }

    #[test]
    fn test_delete_material_guarded_by_forms() {
        let mut store = parse_dataset(DATASET).unwrap();
        let err = store.delete_material("gas").unwrap_err();
        assert!(matches!(err, TallyError::Validation(_)));
        assert!(matches!(
            store.delete_material("missing"),
            Err(TallyError::MaterialNotFound(_))
        ));
    }

    #[test]
    fn test_update_material_appends_version() {
        let mut store = parse_dataset(DATASET).unwrap();
        let mut next = store.latest_material("gas").unwrap().unwrap();
        next.id = "gas-v3".into();
        let head = store.update_material(next.clone()).unwrap();
        assert_eq!(head.version, 3);
        assert!(store.update_material(next).is_err());
    }

    #[test]
    fn test_invalid_latest_flags_rejected() {
        let json = r#"{ "calculations": [
            { "name": "a", "uniqueId": "a", "version": 1, "latest": true, "expression": [] },
            { "name": "a", "uniqueId": "a", "version": 2, "latest": true, "expression": [] }
        ] }"#;
        assert!(matches!(parse_dataset(json), Err(TallyError::Validation(_))));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let store = parse_dataset(DATASET).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        save_dataset(&store, &path).unwrap();
        let loaded = load_dataset(&path).unwrap();
        assert_eq!(loaded.latest_material("gas").unwrap().unwrap().id, "gas-v2");
        assert!(loaded.company("c1").unwrap().is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_dataset(Path::new("/nonexistent/tally.json")).unwrap_err();
        assert!(matches!(err, TallyError::DatasetLoad { .. }));
    }
}
