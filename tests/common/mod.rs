use feature_state::{Entity, Scope};
use serde_json::{json, Value};

/// Initialize tracing for a test binary; later calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "feature_state=debug".into()),
    );
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub struct User {
    pub id: i64,
}

impl Entity for User {
    fn entity_kind(&self) -> &str {
        "user"
    }

    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

pub fn user(id: i64) -> Scope {
    Scope::from_entity(&User { id })
}

/// `true` for entity scopes with an even numeric id.
pub fn even_id(scope: &Scope) -> Value {
    json!(scope
        .entity_id()
        .and_then(|id| id.parse::<i64>().ok())
        .is_some_and(|id| id % 2 == 0))
}
