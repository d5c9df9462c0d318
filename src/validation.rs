//! Input validation for registration, profile and listing payloads.
//!
//! Each validator collects every violation into a field -> message map and returns
//! `AppError::Validation` when the map is not empty.

use std::collections::BTreeMap;

use crate::{
    error::AppError,
    models::{
        CategoryRequest, ListingCreateRequest, ListingUpdateRequest, RegisterRequest,
        UpdateProfileRequest,
    },
};

const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 100;
const NAME_MIN: usize = 2;
const TEXT_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 4000;

#[derive(Default)]
struct Violations(BTreeMap<String, String>);

impl Violations {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        // First violation per field wins.
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0))
        }
    }
}

/// Minimal structural email check: one `@`, non-empty local part, dotted domain, no spaces.
pub fn check_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err("Invalid email format".to_string())
    }
}

/// 8..=100 characters with an uppercase letter, a lowercase letter and a digit, no whitespace.
pub fn check_password(password: &str) -> Result<(), String> {
    let length = password.chars().count();
    if length == 0 {
        return Err("Password is required".to_string());
    }
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&length) {
        return Err(format!(
            "Password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
        ));
    }
    let has_upper = password.chars().any(char::is_uppercase);
    let has_lower = password.chars().any(char::is_lowercase);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_space = password.chars().any(char::is_whitespace);
    if !has_upper || !has_lower || !has_digit || has_space {
        return Err("Password must include upper, lower, number, and no spaces".to_string());
    }
    Ok(())
}

fn is_name_char(c: char) -> bool {
    c.is_alphabetic() || matches!(c, ' ' | '.' | '\'' | '-')
}

/// 2..=100 characters, at least one letter, only letters and ` .'-`.
pub fn check_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    let length = name.chars().count();
    if !(NAME_MIN..=TEXT_MAX).contains(&length) {
        return Err(format!("Name must be between {NAME_MIN} and {TEXT_MAX} characters"));
    }
    if !name.chars().any(char::is_alphabetic) || !name.chars().all(is_name_char) {
        return Err("Name must contain letters and only letters/spaces/.'-".to_string());
    }
    Ok(())
}

/// Optional place/surname field: up to 100 characters of letters and ` .'-`.
pub fn check_optional_text(field_label: &str, value: Option<&str>) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    if value.chars().count() > TEXT_MAX {
        return Err(format!("{field_label} must be under {TEXT_MAX} characters"));
    }
    if !value.chars().all(is_name_char) {
        return Err(format!("{field_label} may only contain letters/spaces/.'-"));
    }
    Ok(())
}

/// Trims an optional text field; a blank value becomes `None`.
pub fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_register(req: &RegisterRequest) -> Result<(), AppError> {
    let mut violations = Violations::default();
    violations.check("email", check_email(&req.email));
    violations.check("password", check_password(&req.password));
    violations.check("name", check_name(&req.name));
    violations.check("surname", check_optional_text("Surname", req.surname.as_deref()));
    violations.check("city", check_optional_text("City", req.city.as_deref()));
    violations.finish()
}

pub fn validate_profile(req: &UpdateProfileRequest) -> Result<(), AppError> {
    let mut violations = Violations::default();
    violations.check("name", check_name(&req.name));
    violations.check("surname", check_optional_text("Surname", req.surname.as_deref()));
    violations.check("city", check_optional_text("City", req.city.as_deref()));
    if let Some(phone) = req.phone_number.as_deref() {
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        let allowed = phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
        if !allowed || !(6..=20).contains(&digits) {
            violations.add("phone_number", "Invalid phone number");
        }
    }
    violations.finish()
}

fn check_price(violations: &mut Violations, price: f64) {
    if !price.is_finite() || price < 0.0 {
        violations.add("price", "Price must be a non-negative number");
    }
}

fn check_quantity(violations: &mut Violations, quantity: Option<f64>) {
    if quantity.is_some_and(|q| !q.is_finite() || q <= 0.0) {
        violations.add("quantity", "Quantity must be positive");
    }
}

fn check_currency(violations: &mut Violations, currency: Option<&str>) {
    if currency.is_some_and(|c| c.len() != 3 || !c.chars().all(|ch| ch.is_ascii_uppercase())) {
        violations.add("currency", "Currency must be a 3-letter ISO code");
    }
}

fn check_description(violations: &mut Violations, description: Option<&str>) {
    if description.is_some_and(|d| d.chars().count() > DESCRIPTION_MAX) {
        violations.add(
            "description",
            format!("Description must be under {DESCRIPTION_MAX} characters"),
        );
    }
}

pub fn validate_listing_create(req: &ListingCreateRequest) -> Result<(), AppError> {
    let mut violations = Violations::default();
    if req.title.trim().is_empty() {
        violations.add("title", "Title is required");
    }
    if req.city.trim().is_empty() {
        violations.add("city", "City is required");
    }
    check_price(&mut violations, req.price);
    check_quantity(&mut violations, req.quantity);
    check_currency(&mut violations, req.currency.as_deref());
    check_description(&mut violations, req.description.as_deref());
    violations.finish()
}

pub fn validate_listing_update(req: &ListingUpdateRequest) -> Result<(), AppError> {
    let mut violations = Violations::default();
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        violations.add("title", "Title must not be blank");
    }
    if req.city.as_deref().is_some_and(|c| c.trim().is_empty()) {
        violations.add("city", "City must not be blank");
    }
    if let Some(price) = req.price {
        check_price(&mut violations, price);
    }
    check_quantity(&mut violations, req.quantity);
    check_currency(&mut violations, req.currency.as_deref());
    check_description(&mut violations, req.description.as_deref());
    violations.finish()
}

pub fn validate_category(req: &CategoryRequest) -> Result<(), AppError> {
    let mut violations = Violations::default();
    if req.name.trim().is_empty() {
        violations.add("name", "Name is required");
    }
    let slug_ok = !req.slug.is_empty()
        && req
            .slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !slug_ok {
        violations.add("slug", "Slug may only contain lowercase letters, digits and '-'");
    }
    violations.finish()
}
