//! Read-side collaborators consumed by the engine.
//!
//! The engine never constructs its own data access. Callers hand it an
//! [`EngineContext`] that borrows one implementation per concern, so tests can
//! substitute in-memory fakes and production code can share a single store.

use crate::calculation::schema::Calculation;
use crate::error::TallyError;
use crate::model::{Company, Constant, Form, Material, Meter, UnitEdge};
use crate::report::Report;
use std::collections::BTreeMap;

pub trait MaterialProvider: Send + Sync {
    /// Look up a specific material version by its id.
    fn material_by_id(&self, id: &str) -> Result<Option<Material>, TallyError>;

    /// Latest version of a material by its unique id.
    fn latest_material(&self, unique_id: &str) -> Result<Option<Material>, TallyError>;

    /// Latest version of every material.
    fn latest_materials(&self) -> Result<Vec<Material>, TallyError>;
}

pub trait FormProvider: Send + Sync {
    /// Every form submitted by a company for a financial year.
    fn forms_for(&self, company_id: &str, financial_year: &str) -> Result<Vec<Form>, TallyError>;
}

pub trait MeterProvider: Send + Sync {
    /// Every meter filled in against the given form.
    fn meters_for_form(&self, form_id: &str) -> Result<Vec<Meter>, TallyError>;
}

pub trait CompanyProvider: Send + Sync {
    fn company(&self, company_id: &str) -> Result<Option<Company>, TallyError>;
}

pub trait ConstantProvider: Send + Sync {
    fn find_by_unique_id(&self, unique_id: &str) -> Result<Vec<Constant>, TallyError>;

    fn constants(&self) -> Result<Vec<Constant>, TallyError>;
}

pub trait UnitProvider: Send + Sync {
    /// Every edge whose input or output is `unit`.
    fn find_matching_edges(&self, unit: &str) -> Result<Vec<UnitEdge>, TallyError>;
}

pub trait CalculationProvider: Send + Sync {
    /// Head version of a calculation.
    fn latest_calculation(&self, unique_id: &str) -> Result<Option<Calculation>, TallyError>;

    fn latest_calculations(&self) -> Result<Vec<Calculation>, TallyError>;
}

pub trait ReportProvider: Send + Sync {
    fn report(&self, name: &str) -> Result<Option<Report>, TallyError>;
}

pub trait ContentProvider: Send + Sync {
    /// Custom-field translation map for a locale, if the locale is known.
    fn custom_fields(&self, locale: &str) -> Result<Option<BTreeMap<String, String>>, TallyError>;
}

/// The collaborators one engine call runs against.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    pub materials: &'a dyn MaterialProvider,
    pub forms: &'a dyn FormProvider,
    pub meters: &'a dyn MeterProvider,
    pub companies: &'a dyn CompanyProvider,
    pub constants: &'a dyn ConstantProvider,
    pub units: &'a dyn UnitProvider,
    pub calculations: &'a dyn CalculationProvider,
    pub reports: &'a dyn ReportProvider,
    pub contents: &'a dyn ContentProvider,
}

impl<'a> EngineContext<'a> {
    /// Build a context where one value serves every concern.
    pub fn from_store<S>(store: &'a S) -> Self
    where
        S: MaterialProvider
            + FormProvider
            + MeterProvider
            + CompanyProvider
            + ConstantProvider
            + UnitProvider
            + CalculationProvider
            + ReportProvider
            + ContentProvider,
    {
        Self {
            materials: store,
            forms: store,
            meters: store,
            companies: store,
            constants: store,
            units: store,
            calculations: store,
            reports: store,
            contents: store,
        }
    }

    /// Resolve the material a pointer refers to: the exact version when an id
    /// is given, otherwise the latest version of the unique id.
    ///
    /// An id naming a version of a different material is not found.
    pub fn resolve_material(
        &self,
        material_id: Option<&str>,
        unique_id: &str,
    ) -> Result<Material, TallyError> {
        let found = match material_id {
            Some(id) => self
                .materials
                .material_by_id(id)?
                .filter(|m| m.unique_id == unique_id),
            None => self.materials.latest_material(unique_id)?,
        };
        found.ok_or_else(|| match material_id {
            Some(id) => TallyError::MaterialNotFound(format!("{unique_id} (version id {id})")),
            None => TallyError::MaterialNotFound(unique_id.to_string()),
        })
    }

    pub fn company(&self, company_id: &str) -> Result<Company, TallyError> {
        self.companies
            .company(company_id)?
            .ok_or_else(|| TallyError::CompanyNotFound(company_id.to_string()))
    }
}
