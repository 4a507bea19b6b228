//! Cache key construction, centralized so key shapes never drift
//! between writers and invalidators.

pub fn readiness_key(user_id: &str) -> String {
    format!("readiness:{}", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_user() {
        assert_eq!(readiness_key("u1"), "readiness:u1");
        assert_ne!(readiness_key("u1"), readiness_key("u2"));
    }
}
