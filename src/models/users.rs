// src/models/users.rs

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::{
        error::FieldError,
        validation::{clean_optional, validate_phone},
    },
    models::rbac::Role,
};

// Dados do formulário de usuário (criação e edição)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    #[validate(length(min = 1, max = 150, message = "username_length"))]
    #[schema(example = "jperez")]
    pub username: String,

    #[validate(email(message = "email"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "too_long"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "too_long"))]
    pub last_name: String,

    // Obrigatória na criação; na edição, vazia mantém a atual
    #[validate(length(min = 6, message = "password_length"))]
    pub password: Option<String>,

    #[schema(example = "1234567890101")]
    pub dpi: Option<String>,

    pub employee_code: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_optional_phone"))]
    pub phone: String,

    pub role: Role,
}

fn validate_optional_phone(val: &str) -> Result<(), validator::ValidationError> {
    if val.trim().is_empty() { Ok(()) } else { validate_phone(val) }
}

/// Identidade do usuário depois de limpa e validada.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanIdentity {
    pub dpi: Option<String>,
    pub employee_code: Option<String>,
    pub phone: String,
}

impl UserPayload {
    /// Regras que dependem de mais de um campo: DPI com 13 dígitos,
    /// código de empleado até 20 caracteres e vendedor com ambos preenchidos.
    pub fn clean_identity(&self) -> Result<CleanIdentity, Vec<FieldError>> {
        let mut errors = Vec::new();

        let dpi = clean_optional(self.dpi.as_deref());
        if let Some(dpi) = &dpi {
            if !dpi.chars().all(|c| c.is_ascii_digit()) {
                errors.push(FieldError::new("dpi", "dpi_digits"));
            } else if dpi.len() != 13 {
                errors.push(FieldError::new("dpi", "dpi_length"));
            }
        }

        let employee_code = clean_optional(self.employee_code.as_deref());
        if let Some(code) = &employee_code {
            if code.chars().count() > 20 {
                errors.push(FieldError::new("employeeCode", "employee_code_length"));
            }
        }

        if self.role == Role::Salesperson {
            if dpi.is_none() {
                errors.push(FieldError::new("dpi", "salesperson_requires_dpi"));
            }
            if employee_code.is_none() {
                errors.push(FieldError::new("employeeCode", "salesperson_requires_code"));
            }
        }

        if errors.is_empty() {
            Ok(CleanIdentity { dpi, employee_code, phone: self.phone.trim().to_string() })
        } else {
            Err(errors)
        }
    }

    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(role: Role, dpi: Option<&str>, code: Option<&str>) -> UserPayload {
        UserPayload {
            username: "mlopez".into(),
            email: "mlopez@example.com".into(),
            first_name: "María".into(),
            last_name: "López".into(),
            password: Some("secreto1".into()),
            dpi: dpi.map(Into::into),
            employee_code: code.map(Into::into),
            phone: "+502 5555-1234".into(),
            role,
        }
    }

    #[test]
    fn salesperson_needs_dpi_and_employee_code() {
        let errors = payload(Role::Salesperson, None, Some("  ")).clean_identity().unwrap_err();
        let keys: Vec<_> = errors.iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["salesperson_requires_dpi", "salesperson_requires_code"]);

        let ok = payload(Role::Salesperson, Some(" 1234567890101 "), Some("V-01")).clean_identity().unwrap();
        assert_eq!(ok.dpi.as_deref(), Some("1234567890101"));
    }

    #[test]
    fn dpi_must_have_thirteen_digits() {
        let short = payload(Role::Admin, Some("12345"), None).clean_identity().unwrap_err();
        assert_eq!(short[0].key, "dpi_length");
        let letters = payload(Role::Admin, Some("12345678901AB"), None).clean_identity().unwrap_err();
        assert_eq!(letters[0].key, "dpi_digits");
    }

    #[test]
    fn admin_without_identity_is_fine() {
        let clean = payload(Role::Admin, None, None).clean_identity().unwrap();
        assert_eq!(clean.dpi, None);
        assert_eq!(clean.employee_code, None);
    }

    #[test]
    fn long_employee_code_is_refused() {
        let errors = payload(Role::Secretary, None, Some("X".repeat(21).as_str())).clean_identity().unwrap_err();
        assert_eq!(errors[0].field, "employeeCode");
    }

    #[test]
    fn derive_validation_checks_password_and_phone() {
        let mut p = payload(Role::Admin, None, None);
        assert!(p.validate().is_ok());
        p.password = Some("123".into());
        p.phone = "abc".into();
        let errors = p.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
        assert!(errors.field_errors().contains_key("phone"));
    }
}
