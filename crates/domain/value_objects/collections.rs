pub const USERS_COLLECTION: &str = "users";
/// Holds both payment request documents (system keys) and charge outcome
/// documents (reference ids).
pub const PAYMENTS_COLLECTION: &str = "payments";
pub const PAYMENT_FAILURES_COLLECTION: &str = "payment_failures";
