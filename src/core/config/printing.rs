use crate::core::config::data::Config;

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: (unset, using {})", self.base_url()),
        }
        match &self.default_model {
            Some(model) => println!("  default-model: {model}"),
            None => println!("  default-model: (unset, using {})", self.default_model()),
        }
        println!("  test-mode: {}", on_off(self.test_mode.unwrap_or(false)));
        let policy = self.ready_policy();
        println!(
            "  ready-interval-ms: {}",
            policy.interval.as_millis()
        );
        println!("  ready-attempts: {}", policy.max_attempts);
        match &self.log_filter {
            Some(filter) => println!("  log-filter: {filter}"),
            None => println!("  log-filter: (unset)"),
        }
        println!("  keyring: {}", on_off(self.use_keyring()));
    }
}
