//! CSV report rendering for the registry screens.
//!
//! Headers and value formatting follow the municipal report layout (pt-BR
//! labels, `DD/MM/YYYY` dates). Fields containing commas or quotes are
//! quoted with embedded quotes doubled, so re-splitting a row while
//! respecting quoted segments recovers the original values.

use chrono::NaiveDate;

use crate::workflows::distribution::domain::{Delivery, Family, FamilyStatus, Institution};

/// Error raised while rendering a CSV document.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv output was not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Render a header row plus data rows into a CSV document.
pub fn write_csv(headers: &[&str], rows: &[Vec<String>]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn format_income(centavos: u64) -> String {
    format!("R$ {}.{:02}", centavos / 100, centavos % 100)
}

/// Family registry report.
pub fn families_csv(families: &[Family]) -> Result<String, ExportError> {
    let headers = [
        "ID",
        "Nome",
        "Endereço",
        "Telefone",
        "Membros",
        "Renda",
        "Status",
        "Bloqueada até",
        "Criado em",
    ];
    let rows: Vec<Vec<String>> = families
        .iter()
        .map(|family| {
            vec![
                family.id.0.clone(),
                family.name.clone(),
                family.address.clone(),
                family.phone.clone(),
                family.members.to_string(),
                format_income(family.income),
                match family.status {
                    FamilyStatus::Active => "Ativa".to_string(),
                    FamilyStatus::Blocked => "Bloqueada".to_string(),
                },
                family
                    .blocked_until
                    .map(format_date)
                    .unwrap_or_else(|| "N/A".to_string()),
                format_date(family.created_at),
            ]
        })
        .collect();

    write_csv(&headers, &rows)
}

/// Institution report with available basket counts.
pub fn institutions_csv(institutions: &[Institution]) -> Result<String, ExportError> {
    let headers = [
        "ID",
        "Nome",
        "Endereço",
        "Telefone",
        "Cestas Disponíveis",
        "Criado em",
    ];
    let rows: Vec<Vec<String>> = institutions
        .iter()
        .map(|institution| {
            vec![
                institution.id.0.clone(),
                institution.name.clone(),
                institution.address.clone(),
                institution.phone.clone(),
                institution.inventory.baskets().to_string(),
                format_date(institution.created_at),
            ]
        })
        .collect();

    write_csv(&headers, &rows)
}

/// Delivery log report.
pub fn deliveries_csv(deliveries: &[Delivery]) -> Result<String, ExportError> {
    let headers = [
        "ID",
        "Família",
        "Instituição",
        "Data da Entrega",
        "Cestas Entregues",
        "Criado em",
    ];
    let rows: Vec<Vec<String>> = deliveries
        .iter()
        .map(|delivery| {
            vec![
                delivery.id.0.clone(),
                delivery.family_name.clone(),
                delivery.institution_name.clone(),
                format_date(delivery.delivery_date),
                delivery.items.baskets.to_string(),
                format_date(delivery.created_at),
            ]
        })
        .collect();

    write_csv(&headers, &rows)
}
