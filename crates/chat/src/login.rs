use parley_storage::{AuthRecord, AuthStore};
use rand::Rng;

use crate::countries::{Country, CountrySource};
use crate::events::{FieldError, Notice};
use crate::scheduler::{Scheduler, TimerDriven};
use crate::timings::Timings;

pub const OTP_SENT_NOTICE: &str = "OTP sent successfully!";
pub const OTP_VERIFIED_NOTICE: &str = "OTP verified! Logging in...";
pub const INVALID_OTP: &str = "Invalid OTP";
pub const COUNTRY_FETCH_FAILED_NOTICE: &str = "Failed to fetch country data";
pub const LOGIN_PERSIST_FAILED_NOTICE: &str = "Failed to save login";

pub const COUNTRY_REQUIRED: &str = "Select a country";
pub const PHONE_TOO_SHORT: &str = "Phone number must be at least 10 digits";
pub const PHONE_TOO_LONG: &str = "Phone number must be at most 15 digits";
pub const PHONE_NOT_DIGITS: &str = "Phone number must contain only digits";
pub const OTP_WRONG_LENGTH: &str = "OTP must be 6 digits";

const PHONE_MIN_LEN: usize = 10;
const PHONE_MAX_LEN: usize = 15;
const OTP_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    Phone,
    Otp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneDetails {
    pub country: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginTask {
    SendOtp(PhoneDetails),
    VerifyOtp(String),
}

pub fn validate_phone(country: &str, phone: &str) -> Result<PhoneDetails, Vec<FieldError>> {
    let mut errors = Vec::new();
    let country = country.trim();
    let phone = phone.trim();

    if country.is_empty() {
        errors.push(FieldError::new("country", COUNTRY_REQUIRED));
    }

    let length = phone.chars().count();
    if length < PHONE_MIN_LEN {
        errors.push(FieldError::new("phone", PHONE_TOO_SHORT));
    }
    if length > PHONE_MAX_LEN {
        errors.push(FieldError::new("phone", PHONE_TOO_LONG));
    }
    if phone.is_empty() || !phone.chars().all(|character| character.is_ascii_digit()) {
        errors.push(FieldError::new("phone", PHONE_NOT_DIGITS));
    }

    if errors.is_empty() {
        Ok(PhoneDetails {
            country: country.to_string(),
            phone: phone.to_string(),
        })
    } else {
        Err(errors)
    }
}

pub fn validate_otp(otp: &str) -> Result<String, Vec<FieldError>> {
    if otp.chars().count() == OTP_LEN {
        Ok(otp.to_string())
    } else {
        Err(vec![FieldError::new("otp", OTP_WRONG_LENGTH)])
    }
}

/// Two-step phone/OTP login simulation.
pub struct LoginFlow {
    auth: AuthStore,
    timings: Timings,
    scheduler: Scheduler<LoginTask>,
    step: LoginStep,
    countries: Vec<Country>,
    phone: Option<PhoneDetails>,
    generated_otp: Option<String>,
    otp_error: Option<&'static str>,
    loading: bool,
    logged_in: bool,
    notices: Vec<Notice>,
}

impl LoginFlow {
    pub fn new(auth: AuthStore, timings: Timings) -> Self {
        Self {
            auth,
            timings,
            scheduler: Scheduler::new(),
            step: LoginStep::Phone,
            countries: Vec::new(),
            phone: None,
            generated_otp: None,
            otp_error: None,
            loading: false,
            logged_in: false,
            notices: Vec::new(),
        }
    }

    /// Fills the country picker; a failing source leaves it empty and the form usable.
    pub fn load_countries(&mut self, source: &dyn CountrySource) {
        match source.fetch() {
            Ok(countries) => {
                tracing::debug!(count = countries.len(), "loaded country list");
                self.countries = countries;
            }
            Err(error) => {
                tracing::warn!(%error, "country list unavailable");
                self.countries.clear();
                self.notices.push(Notice::error(COUNTRY_FETCH_FAILED_NOTICE));
            }
        }
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn step(&self) -> LoginStep {
        self.step
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Shown on the OTP step in place of a real SMS.
    pub fn generated_otp(&self) -> Option<&str> {
        self.generated_otp.as_deref()
    }

    pub fn otp_error(&self) -> Option<&'static str> {
        self.otp_error
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Validates the phone form and schedules the simulated OTP dispatch.
    ///
    /// Returns `Ok(false)` when the flow is busy or not on the phone step.
    pub fn submit_phone(&mut self, country: &str, phone: &str) -> Result<bool, Vec<FieldError>> {
        if self.loading || self.step != LoginStep::Phone {
            return Ok(false);
        }

        let details = validate_phone(country, phone)?;
        self.loading = true;
        self.scheduler
            .schedule(self.timings.otp_delay(), LoginTask::SendOtp(details));
        Ok(true)
    }

    pub fn submit_otp(&mut self, otp: &str) -> Result<bool, Vec<FieldError>> {
        if self.loading || self.step != LoginStep::Otp {
            return Ok(false);
        }

        let otp = validate_otp(otp)?;
        self.loading = true;
        self.scheduler
            .schedule(self.timings.otp_delay(), LoginTask::VerifyOtp(otp));
        Ok(true)
    }

    fn send_otp(&mut self, details: PhoneDetails) {
        let otp = rand::thread_rng().gen_range(100_000..1_000_000).to_string();
        tracing::info!(country = %details.country, "issued one-time password");

        self.phone = Some(details);
        self.generated_otp = Some(otp);
        self.otp_error = None;
        self.step = LoginStep::Otp;
        self.notices.push(Notice::success(OTP_SENT_NOTICE));
    }

    fn verify_otp(&mut self, otp: String) {
        if self.generated_otp.as_deref() != Some(otp.as_str()) {
            self.otp_error = Some(INVALID_OTP);
            self.notices.push(Notice::error(INVALID_OTP));
            return;
        }

        self.otp_error = None;
        let Some(details) = self.phone.clone() else {
            return;
        };

        let record = AuthRecord {
            country: details.country,
            phone: details.phone,
            logged_in: true,
        };
        let token = uuid::Uuid::new_v4().simple().to_string();

        if let Err(error) = self.auth.save(&record, &token) {
            tracing::warn!(%error, "failed to persist login");
            self.notices.push(Notice::error(LOGIN_PERSIST_FAILED_NOTICE));
            return;
        }

        self.logged_in = true;
        self.notices.push(Notice::success(OTP_VERIFIED_NOTICE));
        tracing::info!("login completed");
    }
}

impl TimerDriven for LoginFlow {
    type Task = LoginTask;

    fn scheduler(&self) -> &Scheduler<LoginTask> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<LoginTask> {
        &mut self.scheduler
    }

    fn fire(&mut self, task: LoginTask) {
        self.loading = false;
        match task {
            LoginTask::SendOtp(details) => self.send_otp(details),
            LoginTask::VerifyOtp(otp) => self.verify_otp(otp),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parley_storage::MemoryStore;

    use super::*;
    use crate::countries::{CountryError, UnconfiguredCountrySource};
    use crate::events::NoticeLevel;

    struct FixedCountries;

    impl CountrySource for FixedCountries {
        fn fetch(&self) -> Result<Vec<Country>, CountryError> {
            Ok(vec![Country {
                name: "Canada".to_string(),
                code: "+1".to_string(),
                flag: None,
            }])
        }
    }

    fn flow() -> (AuthStore, LoginFlow) {
        let auth = AuthStore::new(Arc::new(MemoryStore::new()));
        (auth.clone(), LoginFlow::new(auth, Timings::default()))
    }

    fn messages(errors: Vec<FieldError>) -> Vec<&'static str> {
        errors.into_iter().map(|error| error.message).collect()
    }

    #[test]
    fn phone_validation_rules() {
        assert!(validate_phone("+1", " 5551234567 ").is_ok());
        assert_eq!(
            messages(validate_phone("", "5551234567").unwrap_err()),
            vec![COUNTRY_REQUIRED]
        );
        assert_eq!(messages(validate_phone("+1", "12345").unwrap_err()), vec![PHONE_TOO_SHORT]);
        assert_eq!(
            messages(validate_phone("+1", "1234567890123456").unwrap_err()),
            vec![PHONE_TOO_LONG]
        );
        assert_eq!(
            messages(validate_phone("+1", "555-123-4567").unwrap_err()),
            vec![PHONE_NOT_DIGITS]
        );
    }

    #[test]
    fn otp_must_be_six_characters() {
        assert!(validate_otp("123456").is_ok());
        assert_eq!(messages(validate_otp("12345").unwrap_err()), vec![OTP_WRONG_LENGTH]);
        assert_eq!(messages(validate_otp("1234567").unwrap_err()), vec![OTP_WRONG_LENGTH]);
    }

    #[test]
    fn invalid_phone_schedules_nothing() {
        let (_, mut flow) = flow();
        assert!(flow.submit_phone("+1", "abc").is_err());
        assert!(!flow.is_loading());
        assert!(flow.scheduler().is_empty());
    }

    #[test]
    fn full_login_persists_auth() {
        let (auth, mut flow) = flow();

        assert_eq!(flow.submit_phone("+1", "5551234567"), Ok(true));
        assert!(flow.is_loading());
        assert_eq!(flow.submit_phone("+1", "5551234567"), Ok(false));

        flow.advance(Duration::from_millis(1_199));
        assert_eq!(flow.step(), LoginStep::Phone);
        flow.advance(Duration::from_millis(1));
        assert_eq!(flow.step(), LoginStep::Otp);
        assert!(!flow.is_loading());

        let otp = flow.generated_otp().unwrap().to_string();
        assert_eq!(otp.len(), 6);
        assert!(otp.parse::<u32>().unwrap() >= 100_000);

        assert_eq!(flow.submit_otp(&otp), Ok(true));
        flow.advance(Duration::from_millis(1_200));

        assert!(flow.is_logged_in());
        assert!(auth.is_authenticated());
        assert_eq!(
            auth.load(),
            Some(AuthRecord {
                country: "+1".to_string(),
                phone: "5551234567".to_string(),
                logged_in: true,
            })
        );
        assert_eq!(
            flow.take_notices(),
            vec![Notice::success(OTP_SENT_NOTICE), Notice::success(OTP_VERIFIED_NOTICE)]
        );
    }

    #[test]
    fn wrong_otp_sets_inline_error() {
        let (auth, mut flow) = flow();
        flow.submit_phone("+44", "07123456789").unwrap();
        flow.advance(Duration::from_millis(1_200));
        flow.take_notices();

        let wrong = if flow.generated_otp() == Some("000000") {
            "111111"
        } else {
            "000000"
        };
        flow.submit_otp(wrong).unwrap();
        flow.advance(Duration::from_millis(1_200));

        assert_eq!(flow.otp_error(), Some(INVALID_OTP));
        assert!(!flow.is_logged_in());
        assert!(!auth.is_authenticated());
        let notices = flow.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[test]
    fn country_failure_degrades_to_empty_list() {
        let (_, mut flow) = flow();
        flow.load_countries(&FixedCountries);
        assert_eq!(flow.countries().len(), 1);

        flow.load_countries(&UnconfiguredCountrySource);
        assert!(flow.countries().is_empty());
        assert_eq!(
            flow.take_notices(),
            vec![Notice::error(COUNTRY_FETCH_FAILED_NOTICE)]
        );
        assert_eq!(flow.submit_phone("+1", "5551234567"), Ok(true));
    }
}
