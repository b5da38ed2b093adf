// src/common/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

// As funções abaixo devolvem apenas o código; a mensagem vem do catálogo "validation.<código>"

/// Maior valor que cabe numa coluna NUMERIC(10,2).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Cabe em NUMERIC(10,2) sem arredondar?
pub fn fits_amount(val: &Decimal) -> bool {
    val.normalize().scale() <= 2 && val.abs() <= MAX_AMOUNT
}

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        return Err(ValidationError::new("not_negative"));
    }
    Ok(())
}

pub fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        return Err(ValidationError::new("positive"));
    }
    Ok(())
}

/// Quantidade de uma linha: positiva, até 2 casas decimais e dentro de NUMERIC(10,2).
pub fn validate_quantity(val: &Decimal) -> Result<(), ValidationError> {
    validate_positive(val)?;
    if val.normalize().scale() > 2 {
        return Err(ValidationError::new("quantity_scale"));
    }
    if *val > MAX_AMOUNT {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

/// Valor contado (pode ser zero), com as mesmas regras de escala da quantidade.
pub fn validate_count(val: &Decimal) -> Result<(), ValidationError> {
    validate_not_negative(val)?;
    if val.normalize().scale() > 2 {
        return Err(ValidationError::new("quantity_scale"));
    }
    if *val > MAX_AMOUNT {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

/// Telefone: depois de remover '-', ' ' e '+', só dígitos (máx. 15).
pub fn validate_phone(val: &str) -> Result<(), ValidationError> {
    let digits = phone_digits(val);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("phone_digits"));
    }
    if val.chars().count() > 15 {
        return Err(ValidationError::new("phone_length"));
    }
    Ok(())
}

pub fn phone_digits(val: &str) -> String {
    val.chars().filter(|c| !matches!(c, '-' | ' ' | '+')).collect()
}

pub fn validate_latitude(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::from(-90) || *val > Decimal::from(90) {
        return Err(ValidationError::new("latitude_range"));
    }
    Ok(())
}

pub fn validate_longitude(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::from(-180) || *val > Decimal::from(180) {
        return Err(ValidationError::new("longitude_range"));
    }
    Ok(())
}

pub fn validate_not_blank(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

/// Texto opcional: vazio ou só espaços vira None.
pub fn clean_optional(val: Option<&str>) -> Option<String> {
    val.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn phone_accepts_separators() {
        assert!(validate_phone("+502 5555-1234").is_ok());
        assert!(validate_phone("55551234").is_ok());
        assert_eq!(phone_digits("+502 5555-1234"), "50255551234");
    }

    #[test]
    fn phone_rejects_letters_and_long_values() {
        assert_eq!(validate_phone("5555-12a4").unwrap_err().code, "phone_digits");
        assert_eq!(validate_phone("---").unwrap_err().code, "phone_digits");
        assert_eq!(validate_phone("1234567890123456").unwrap_err().code, "phone_length");
    }

    #[test]
    fn coordinates_must_be_in_range() {
        assert!(validate_latitude(&Decimal::from_str("14.6349").unwrap()).is_ok());
        assert!(validate_latitude(&Decimal::from(91)).is_err());
        assert!(validate_longitude(&Decimal::from(-180)).is_ok());
        assert!(validate_longitude(&Decimal::from_str("-180.1").unwrap()).is_err());
    }

    #[test]
    fn amounts() {
        assert!(validate_not_negative(&Decimal::ZERO).is_ok());
        assert!(validate_not_negative(&Decimal::from(-1)).is_err());
        assert!(validate_positive(&Decimal::ZERO).is_err());
        assert!(validate_positive(&Decimal::from_str("0.5").unwrap()).is_ok());
    }

    #[test]
    fn quantities_must_fit_the_column() {
        let q = |v: &str| validate_quantity(&Decimal::from_str(v).unwrap());
        assert!(q("1.5").is_ok());
        assert!(q("2.50").is_ok());
        assert!(q("99999999.99").is_ok());
        assert_eq!(q("0.004").unwrap_err().code, "quantity_scale");
        assert_eq!(q("1.005").unwrap_err().code, "quantity_scale");
        assert_eq!(q("1000000000").unwrap_err().code, "amount_too_large");
        assert_eq!(q("0").unwrap_err().code, "positive");
        assert_eq!(MAX_AMOUNT, Decimal::from_str("99999999.99").unwrap());
    }

    #[test]
    fn counted_amounts_accept_zero() {
        let c = |v: &str| validate_count(&Decimal::from_str(v).unwrap());
        assert!(c("0").is_ok());
        assert!(c("12.25").is_ok());
        assert_eq!(c("-1").unwrap_err().code, "not_negative");
        assert_eq!(c("0.001").unwrap_err().code, "quantity_scale");
    }

    #[test]
    fn blank_optional_text_is_none() {
        assert_eq!(clean_optional(Some("  ")), None);
        assert_eq!(clean_optional(Some(" a ")), Some("a".into()));
        assert_eq!(clean_optional(None), None);
    }
}
