use regex::Regex;
use std::sync::OnceLock;

use super::models::{RegisterRequest, SignupForm};
use crate::common::validation::{ValidationResult, Validator};

pub const MIN_PASSWORD_LEN: usize = 8;

pub const PHONE_FORMAT_MESSAGE: &str = "전화번호는 010-1234-5678 형태로 입력해주세요";
pub const PASSWORD_MESSAGE: &str =
    "비밀번호는 최소 8자 이상이어야 하며, 두 비밀번호가 일치해야 합니다";

pub fn validate_phone(phone: &str) -> bool {
    static PHONE: OnceLock<Option<Regex>> = OnceLock::new();
    PHONE
        .get_or_init(|| Regex::new(r"^010-\d{4}-\d{4}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(phone))
}

pub fn validate_passwords(password: &str, confirm: &str) -> bool {
    password == confirm && password.chars().count() >= MIN_PASSWORD_LEN
}

/// Dashes digits as they are typed: `010`, `010-1234`, `010-1234-5678`.
/// Anything past eleven digits is dropped.
pub fn format_phone_input(value: &str) -> String {
    let digits: String = value
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(11)
        .collect();

    match digits.len() {
        0..=3 => digits,
        4..=7 => format!("{}-{}", &digits[..3], &digits[3..]),
        _ => format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]),
    }
}

pub struct SignupValidator;

impl Validator<SignupForm> for SignupValidator {
    fn validate(&self, form: &SignupForm) -> ValidationResult {
        let mut result = ValidationResult::new();

        if form.name.trim().is_empty() {
            result.add_error("name", "이름을 입력해주세요");
        }
        if !validate_phone(form.phone.trim()) {
            result.add_error("phone", PHONE_FORMAT_MESSAGE);
        }
        if !validate_passwords(&form.password, &form.confirm_password) {
            result.add_error("password", PASSWORD_MESSAGE);
        }

        result
    }
}

impl SignupForm {
    pub fn validate(&self) -> ValidationResult {
        SignupValidator.validate(self)
    }
}

impl From<&SignupForm> for RegisterRequest {
    fn from(form: &SignupForm) -> Self {
        let phonenumber: String = form.phone.chars().filter(|c| c.is_ascii_digit()).collect();
        Self {
            name: form.name.trim().to_string(),
            password: form.password.trim().to_string(),
            address: form.address.trim().to_string(),
            gender: form.gender.trim().to_string(),
            phonenumber,
            birth: form.birth.trim().to_string(),
        }
    }
}
