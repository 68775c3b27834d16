pub mod time;

/// Generates a url-safe random id, used for subscriber ids.
pub fn longid() -> String {
    nanoid::nanoid!()
}

/// Generates a v4 uuid string, used for flow and execution ids.
pub fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
