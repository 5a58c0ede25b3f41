use mockall::mock;

use crate::{
    auth::{AuthenticatedUser, Authenticator},
    errors::AuthError,
};

mock! {
    pub Authenticator {}
    impl Authenticator for Authenticator {
        fn authenticate(&self, bearer_token: &str) -> Result<AuthenticatedUser, AuthError>;
    }
}

pub const ORGANIZER_TOKEN: &str = "token-organizer";
pub const BUDI_TOKEN: &str = "token-budi";
pub const SITI_TOKEN: &str = "token-siti";

pub fn user(name: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: format!("user-{name}"),
        email: format!("{name}@warga.test"),
        full_name: Some(name.to_string()),
        phone: None,
    }
}

/// Maps each of the test tokens to a fixed user and rejects everything else.
pub fn authenticator() -> MockAuthenticator {
    let mut auth = MockAuthenticator::new();
    auth.expect_authenticate().returning(|token| match token {
        ORGANIZER_TOKEN => Ok(user("organizer")),
        BUDI_TOKEN => Ok(user("budi")),
        SITI_TOKEN => Ok(user("siti")),
        _ => Err(AuthError::ValidationError("signature has failed verification".into())),
    });
    auth
}
