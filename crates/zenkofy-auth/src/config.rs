//! Token verification settings

/// Audience Supabase puts on tokens of signed-in users
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Access token verification configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Project JWT secret (HS256)
    pub jwt_secret: String,
    /// Expected `aud` claim
    pub audience: String,
    /// Expected `iss` claim, when set
    pub issuer: Option<String>,
    /// Clock skew tolerated on `exp`, in seconds
    pub leeway_secs: u64,
}

impl AuthConfig {
    /// Create a new auth config
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            audience: AUTHENTICATED_AUDIENCE.to_string(),
            issuer: None,
            leeway_secs: 30,
        }
    }

    /// Require the issuer Supabase Auth uses for a project URL
    pub fn with_supabase_issuer(mut self, supabase_url: &str) -> Self {
        self.issuer = Some(format!("{}/auth/v1", supabase_url.trim_end_matches('/')));
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}
