use crate::http::security::authenticator::DaoAuthenticationProvider;
use crate::http::security::authorizer::{PolicyEvaluator, RequestMatcherAuthorizer};
use crate::http::security::crypto::PasswordEncoder;
use crate::http::security::user_details::{InMemoryUserDetailsService, UserAccount, UserDetailsService};

pub struct AuthenticationManager {}

impl AuthenticationManager {
    pub fn dao_authentication<U, E>(user_details: U, password_encoder: E) -> DaoAuthenticationProvider
    where
        U: UserDetailsService + 'static,
        E: PasswordEncoder + 'static,
    {
        DaoAuthenticationProvider::new(user_details, password_encoder)
    }

    pub fn in_memory_users(accounts: impl IntoIterator<Item = UserAccount>) -> InMemoryUserDetailsService {
        InMemoryUserDetailsService::new().with_users(accounts)
    }
}

pub struct AuthorizationManager {}

impl AuthorizationManager {
    pub fn request_matcher(policy: PolicyEvaluator) -> RequestMatcherAuthorizer {
        RequestMatcherAuthorizer::new(policy)
    }
}
