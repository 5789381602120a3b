//! Server-side input validation
//!
//! Request bodies deserialize into the loose `*Input` structs below (every
//! field optional) and are checked here. All failures for one request are
//! collected and returned together as `Error::Validation`.

use crate::db::models::{AssetStatus, NewAsset, NewLicense, NewTicket, Priority, Role};
use crate::error::FieldError;
use crate::time::parse_date;
use crate::{Error, Result};
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

/// Hard cap applied by `sanitize_string`
pub const MAX_SANITIZED_LEN: usize = 10_000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTicketInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAssetInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLicenseInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub license_key: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub assigned_user_id: Option<String>,
}

/// Validated user fields; the password is still plain text
#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
}

/// Trim, drop control characters and `<script>` blocks, cap the length
pub fn sanitize_string(input: &str) -> String {
    let without_controls: String = input.trim().chars().filter(|c| !c.is_control()).collect();
    strip_script_blocks(&without_controls)
        .chars()
        .take(MAX_SANITIZED_LEN)
        .collect()
}

/// Like `sanitize_string` but keeps line breaks and tabs
pub fn sanitize_multiline(input: &str) -> String {
    let without_controls: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();
    strip_script_blocks(&without_controls)
        .chars()
        .take(MAX_SANITIZED_LEN)
        .collect()
}

/// Lower-case, trim and cap at 255 characters
pub fn sanitize_email(email: &str) -> String {
    email.trim().to_lowercase().chars().take(255).collect()
}

/// Identifiers are UUIDs
pub fn is_valid_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

fn strip_script_blocks(input: &str) -> String {
    // ASCII lower-casing keeps byte offsets aligned with `input`
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(rel_start) = lower[cursor..].find("<script") {
        let start = cursor + rel_start;
        let Some(rel_end) = lower[start..].find("</script>") else {
            break;
        };
        out.push_str(&input[cursor..start]);
        cursor = start + rel_end + "</script>".len();
    }

    out.push_str(&input[cursor..]);
    out
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Required text with length bounds
fn required_text(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
    min_message: &str,
    max_message: &str,
) -> String {
    let value = value.map(sanitize_string).unwrap_or_default();
    let len = char_len(&value);
    if len < min {
        errors.push(FieldError::new(field, min_message));
    } else if len > max {
        errors.push(FieldError::new(field, max_message));
    }
    value
}

fn required_enum<T: FromStr>(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&str>,
    message: &str,
) -> Option<T> {
    match value.map(str::trim).and_then(|v| v.parse::<T>().ok()) {
        Some(parsed) => Some(parsed),
        None => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

fn optional_date(errors: &mut Vec<FieldError>, field: &str, value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    if parse_date(value).is_some() {
        Some(value.to_string())
    } else {
        errors.push(FieldError::new(field, "Invalid date, expected YYYY-MM-DD"));
        None
    }
}

fn finish<T>(errors: Vec<FieldError>, value: Option<T>) -> Result<T> {
    match value {
        Some(value) if errors.is_empty() => Ok(value),
        _ => Err(Error::Validation(errors)),
    }
}

/// Ticket creation; the owner is the authenticated user
pub fn validate_create_ticket(input: &CreateTicketInput, user_id: &str) -> Result<NewTicket> {
    let mut errors = Vec::new();

    let title = required_text(
        &mut errors,
        "title",
        input.title.as_deref(),
        1,
        200,
        "Title is required",
        "Title must be less than 200 characters",
    );

    let description = input.description.as_deref().map(sanitize_multiline).unwrap_or_default();
    let description_len = char_len(&description);
    if description_len < 10 {
        errors.push(FieldError::new("description", "Description must be at least 10 characters"));
    } else if description_len > 2000 {
        errors.push(FieldError::new("description", "Description must be less than 2000 characters"));
    }

    let priority = required_enum::<Priority>(
        &mut errors,
        "priority",
        input.priority.as_deref(),
        "Priority must be one of LOW, MEDIUM, HIGH, CRITICAL",
    );

    let category = required_text(
        &mut errors,
        "category",
        input.category.as_deref(),
        1,
        100,
        "Category is required",
        "Category must be less than 100 characters",
    );

    if !is_valid_id(user_id) {
        errors.push(FieldError::new("userId", "Invalid user ID"));
    }

    let ticket = priority.map(|priority| NewTicket {
        title,
        description,
        priority,
        category,
        user_id: user_id.to_string(),
    });
    finish(errors, ticket)
}

pub fn validate_create_asset(input: &CreateAssetInput) -> Result<NewAsset> {
    let mut errors = Vec::new();

    let name = required_text(
        &mut errors,
        "name",
        input.name.as_deref(),
        1,
        200,
        "Asset name is required",
        "Asset name must be less than 200 characters",
    );

    let asset_type = required_text(
        &mut errors,
        "type",
        input.asset_type.as_deref(),
        1,
        100,
        "Asset type is required",
        "Asset type must be less than 100 characters",
    );

    // Blank serial numbers are stored as NULL so they never collide
    let serial_number = input
        .serial_number
        .as_deref()
        .map(sanitize_string)
        .filter(|s| !s.is_empty());
    if serial_number.as_deref().map(char_len).unwrap_or(0) > 100 {
        errors.push(FieldError::new(
            "serialNumber",
            "Serial number must be less than 100 characters",
        ));
    }

    let status = match input.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Some(AssetStatus::Available),
        Some(raw) => required_enum::<AssetStatus>(
            &mut errors,
            "status",
            Some(raw),
            "Status must be one of AVAILABLE, ASSIGNED, UNDER_MAINTENANCE, RETIRED",
        ),
    };

    let purchase_date = optional_date(&mut errors, "purchaseDate", input.purchase_date.as_deref());

    let asset = status.map(|status| NewAsset {
        name,
        asset_type,
        serial_number,
        status,
        purchase_date,
    });
    finish(errors, asset)
}

/// Minimal structural email check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

pub fn validate_create_user(input: &CreateUserInput) -> Result<UserDraft> {
    let mut errors = Vec::new();

    let name = input.name.as_deref().map(sanitize_string).unwrap_or_default();
    let name_len = char_len(&name);
    if name_len == 0 {
        errors.push(FieldError::new("name", "Name is required"));
    } else if name_len < 2 {
        errors.push(FieldError::new("name", "Name must be at least 2 characters"));
    } else if name_len > 100 {
        errors.push(FieldError::new("name", "Name must be less than 100 characters"));
    }

    let raw_email = input.email.as_deref().unwrap_or_default().trim().to_lowercase();
    if char_len(&raw_email) > 255 {
        errors.push(FieldError::new("email", "Email must be less than 255 characters"));
    } else if !is_valid_email(&raw_email) {
        errors.push(FieldError::new("email", "Invalid email address"));
    }

    let role = match input.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        None => Some(Role::EndUser),
        Some(raw) => required_enum::<Role>(
            &mut errors,
            "role",
            Some(raw),
            "Role must be END_USER or ADMIN",
        ),
    };

    let password = input.password.clone().unwrap_or_default();
    let password_len = char_len(&password);
    if password_len < 6 {
        errors.push(FieldError::new("password", "Password must be at least 6 characters"));
    } else if password_len > 100 {
        errors.push(FieldError::new("password", "Password must be less than 100 characters"));
    } else if !password_is_strong(&password) {
        errors.push(FieldError::new(
            "password",
            "Password must contain at least one lowercase letter, one uppercase letter, and one number",
        ));
    }

    let draft = role.map(|role| UserDraft {
        name,
        email: raw_email,
        role,
        password,
    });
    finish(errors, draft)
}

fn password_is_strong(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn validate_create_license(input: &CreateLicenseInput) -> Result<NewLicense> {
    let mut errors = Vec::new();

    let name = required_text(
        &mut errors,
        "name",
        input.name.as_deref(),
        1,
        200,
        "License name is required",
        "License name must be less than 200 characters",
    );
    let vendor = required_text(
        &mut errors,
        "vendor",
        input.vendor.as_deref(),
        1,
        100,
        "Vendor is required",
        "Vendor must be less than 100 characters",
    );
    let license_key = required_text(
        &mut errors,
        "licenseKey",
        input.license_key.as_deref(),
        1,
        500,
        "License key is required",
        "License key must be less than 500 characters",
    );
    let expiry_date = optional_date(&mut errors, "expiryDate", input.expiry_date.as_deref());

    let assigned_user_id = input
        .assigned_user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    if let Some(id) = &assigned_user_id {
        if !is_valid_id(id) {
            errors.push(FieldError::new("assignedUserId", "Invalid user ID"));
        }
    }

    finish(
        errors,
        Some(NewLicense {
            name,
            vendor,
            license_key,
            expiry_date,
            assigned_user_id,
        }),
    )
}

/// Check an identifier taken from a path or body
pub fn validate_id(field: &str, id: &str, message: &str) -> Result<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(Error::Validation(vec![FieldError::new(field, message)]))
    }
}

/// Optional identifier: blank or absent means "unassign"
pub fn validate_optional_id(field: &str, id: Option<&str>) -> Result<Option<String>> {
    match id.map(str::trim).filter(|id| !id.is_empty()) {
        None => Ok(None),
        Some(id) => {
            validate_id(field, id, "Invalid user ID")?;
            Ok(Some(id.to_string()))
        }
    }
}

/// Parse a required enum field of a status or role update
pub fn parse_enum<T: FromStr>(field: &str, value: Option<&str>, message: &str) -> Result<T> {
    let mut errors = Vec::new();
    let parsed = required_enum::<T>(&mut errors, field, value, message);
    finish(errors, parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TicketStatus;

    const USER_ID: &str = "6f1c2b1e-6a86-4a40-8d0a-9f9d6b1f1c11";

    fn ticket_input() -> CreateTicketInput {
        CreateTicketInput {
            title: Some("  Printer jammed ".into()),
            description: Some("The printer on floor 3 is jammed again.".into()),
            priority: Some("HIGH".into()),
            category: Some("Hardware".into()),
        }
    }

    #[test]
    fn test_sanitize_strips_controls_and_scripts() {
        let dirty = "  hello\u{0007} <SCRIPT>alert(1)</script>world  ";
        assert_eq!(sanitize_string(dirty), "hello world");
    }

    #[test]
    fn test_sanitize_keeps_unclosed_script_text() {
        assert_eq!(sanitize_string("a <script> b"), "a <script> b");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(MAX_SANITIZED_LEN + 50);
        assert_eq!(sanitize_string(&long).len(), MAX_SANITIZED_LEN);
    }

    #[test]
    fn test_sanitize_multiline_keeps_newlines() {
        assert_eq!(sanitize_multiline("line one\nline two\u{0000}"), "line one\nline two");
    }

    #[test]
    fn test_valid_ticket_is_trimmed() {
        let ticket = validate_create_ticket(&ticket_input(), USER_ID).unwrap();
        assert_eq!(ticket.title, "Printer jammed");
        assert_eq!(ticket.priority, Priority::High);
    }

    #[test]
    fn test_ticket_errors_are_collected() {
        let input = CreateTicketInput {
            title: Some("   ".into()),
            description: Some("short".into()),
            priority: Some("URGENT".into()),
            category: None,
        };
        let Err(Error::Validation(errors)) = validate_create_ticket(&input, "not-a-uuid") else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "description", "priority", "category", "userId"]);
    }

    #[test]
    fn test_title_length_limit() {
        let mut input = ticket_input();
        input.title = Some("t".repeat(201));
        assert!(validate_create_ticket(&input, USER_ID).is_err());
        input.title = Some("t".repeat(200));
        assert!(validate_create_ticket(&input, USER_ID).is_ok());
    }

    #[test]
    fn test_asset_blank_serial_becomes_none() {
        let input = CreateAssetInput {
            name: Some("ThinkPad".into()),
            asset_type: Some("Laptop".into()),
            serial_number: Some("   ".into()),
            status: None,
            purchase_date: Some("2024-01-15".into()),
        };
        let asset = validate_create_asset(&input).unwrap();
        assert_eq!(asset.serial_number, None);
        assert_eq!(asset.status, AssetStatus::Available);
        assert_eq!(asset.purchase_date.as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn test_asset_rejects_bad_date_and_status() {
        let input = CreateAssetInput {
            name: Some("Monitor".into()),
            asset_type: Some("Display".into()),
            serial_number: None,
            status: Some("BROKEN".into()),
            purchase_date: Some("yesterday".into()),
        };
        let Err(Error::Validation(errors)) = validate_create_asset(&input) else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_user_email_lowercased_and_password_rules() {
        let mut input = CreateUserInput {
            name: Some("Dana Admin".into()),
            email: Some("  Dana@Company.COM ".into()),
            role: Some("ADMIN".into()),
            password: Some("Secret1".into()),
        };
        let draft = validate_create_user(&input).unwrap();
        assert_eq!(draft.email, "dana@company.com");
        assert_eq!(draft.role, Role::Admin);

        input.password = Some("secret1".into());
        assert!(validate_create_user(&input).is_err());
        input.password = Some("Sec1".into());
        assert!(validate_create_user(&input).is_err());
    }

    #[test]
    fn test_user_name_too_short() {
        let input = CreateUserInput {
            name: Some("A".into()),
            email: Some("a@b.co".into()),
            role: None,
            password: Some("Passw0rd".into()),
        };
        let err = validate_create_user(&input).unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: name: Name must be at least 2 characters");
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("john@company.com"));
        assert!(!is_valid_email("john@company"));
        assert!(!is_valid_email("john company@x.com"));
        assert!(!is_valid_email("@company.com"));
        assert!(!is_valid_email("a@@b.com"));
    }

    #[test]
    fn test_parse_enum_and_optional_id() {
        let status: TicketStatus = parse_enum("status", Some("RESOLVED"), "bad").unwrap();
        assert_eq!(status, TicketStatus::Resolved);
        assert!(parse_enum::<TicketStatus>("status", Some("DONE"), "bad").is_err());

        assert_eq!(validate_optional_id("assignedUserId", None).unwrap(), None);
        assert_eq!(validate_optional_id("assignedUserId", Some(" ")).unwrap(), None);
        assert!(validate_optional_id("assignedUserId", Some("123")).is_err());
    }
}
