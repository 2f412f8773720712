//! Configuration access port trait.
//!
//! The `get_*` accessors fall back to `default` for missing or unparseable
//! values; use `config_validation::read_f64`/`read_usize` where a malformed
//! value must be rejected.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
