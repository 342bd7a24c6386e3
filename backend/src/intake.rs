//! Turns an uploaded workbook into normalized [`Lead`] records.
//!
//! The upload arrives as the JSON the file picker produces: a file name and
//! a list of sheets, each a grid of cells whose first row is the header.
//! Only the first sheet is read. Header cells are trimmed and used as keys;
//! the keys are then mapped onto a fixed lead schema and anything else is
//! dropped.

use std::collections::BTreeMap;
use std::path::Path;

use allocation::Lead;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::InputError;

/// One uploaded file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Workbook {
    pub name: String,
    #[serde(default, alias = "data")]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sheet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

impl Workbook {
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// An upload is either a single file or the picker's list of files.
#[derive(Deserialize)]
#[serde(untagged)]
enum UploadShape {
    Many(Vec<Workbook>),
    One(Workbook),
}

/// Read an upload from disk. Returns every file in it, possibly none.
pub fn load_upload(path: &Path) -> anyhow::Result<Vec<Workbook>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_upload(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_upload(raw: &str) -> anyhow::Result<Vec<Workbook>> {
    let files = match serde_json::from_str(raw)? {
        UploadShape::Many(files) => files,
        UploadShape::One(file) => vec![file],
    };
    Ok(files)
}

/// Header-keyed view of one data row.
pub type RowMap = BTreeMap<String, String>;

/// Columns a lead row may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeadField {
    Name,
    Email,
    Phone,
    Address,
    ServiceCategory,
    Service,
    City,
    Amount,
    PinCode,
}

impl LeadField {
    fn from_header(header: &str) -> Option<Self> {
        let field = match header.to_ascii_lowercase().as_str() {
            "name" => LeadField::Name,
            "emailid" | "email" => LeadField::Email,
            "phone" => LeadField::Phone,
            "address" => LeadField::Address,
            "service_category" => LeadField::ServiceCategory,
            "service" => LeadField::Service,
            "city" => LeadField::City,
            "amount" => LeadField::Amount,
            "pincode" => LeadField::PinCode,
            _ => return None,
        };
        Some(field)
    }

    /// Header spelling used by the upload template.
    fn canonical(self) -> &'static str {
        match self {
            LeadField::Name => "Name",
            LeadField::Email => "EmailId",
            LeadField::Phone => "Phone",
            LeadField::Address => "Address",
            LeadField::ServiceCategory => "Service_Category",
            LeadField::Service => "Service",
            LeadField::City => "City",
            LeadField::Amount => "Amount",
            LeadField::PinCode => "PinCode",
        }
    }
}

/// Split the first sheet into header-keyed rows.
pub fn extract_rows(workbook: &Workbook) -> Result<Vec<RowMap>, InputError> {
    let sheet = workbook.sheets.first().ok_or(InputError::NoSheet)?;

    let Some((header_row, data_rows)) = sheet.data.split_first() else {
        return Err(InputError::NoDataRows);
    };
    if data_rows.is_empty() {
        return Err(InputError::NoDataRows);
    }

    let headers: Vec<Option<String>> = header_row
        .iter()
        .map(|cell| cell_text(cell).map(|h| h.trim().to_string()).filter(|h| !h.is_empty()))
        .collect();

    let rows = data_rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .zip(row.iter())
                .filter_map(|(header, cell)| Some((header.clone()?, cell_text(cell)?)))
                .collect()
        })
        .collect();

    Ok(rows)
}

/// Map one header-keyed row onto the lead schema.
///
/// When several headers map to one field, the template spelling wins over
/// variants, and a blank cell never clears a value another column supplied.
pub fn normalize(row: &RowMap, source_file: &str, now: DateTime<Utc>) -> Lead {
    let mut lead = Lead {
        source_file: source_file.to_string(),
        created_at: now,
        ..Default::default()
    };

    for (header, value) in row {
        let Some(field) = LeadField::from_header(header) else {
            debug!(header = %header, "dropping unknown column");
            continue;
        };

        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        let slot = match field {
            LeadField::Name => &mut lead.name,
            LeadField::Email => &mut lead.email,
            LeadField::Phone => &mut lead.phone,
            LeadField::Address => &mut lead.address,
            LeadField::ServiceCategory => &mut lead.service_category,
            LeadField::Service => &mut lead.service,
            LeadField::City => &mut lead.city,
            LeadField::Amount => &mut lead.amount,
            LeadField::PinCode => &mut lead.pincode,
        };

        if slot.is_none() || header == field.canonical() {
            *slot = Some(value.to_string());
        }
    }

    lead
}

/// Extract and normalize every data row of the workbook's first sheet.
#[instrument(skip_all, target = "intake", fields(file = %workbook.name))]
pub fn load_leads(workbook: &Workbook, now: DateTime<Utc>) -> Result<Vec<Lead>, InputError> {
    let rows = extract_rows(workbook)?;

    let leads: Vec<Lead> = rows
        .iter()
        .map(|row| normalize(row, &workbook.name, now))
        .collect();

    debug!(count = leads.len(), "rows normalized");
    Ok(leads)
}

fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
