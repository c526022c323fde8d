use url::Url;

use super::errors::AuthError;

pub const VERIFY_PATH: &str = "/auth/verify";
pub const RESET_CONFIRM_PATH: &str = "/auth/reset/confirm";

/// An outgoing mail, ready for a [`Notifier`](super::notify::Notifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body_html: String,
}

/// Builds the verification and reset mails around the public base URL.
#[derive(Debug, Clone)]
pub struct Templates {
    base: String,
}

impl Templates {
    pub fn new(public_base_url: &str) -> Result<Self, AuthError> {
        let base = public_base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|e| AuthError::Validation(format!("public_base_url: {e}")))?;
        Ok(Self { base })
    }

    pub fn verify_link(&self, token: &str) -> Result<Url, AuthError> {
        self.link(VERIFY_PATH, token)
    }

    pub fn reset_link(&self, token: &str) -> Result<Url, AuthError> {
        self.link(RESET_CONFIRM_PATH, token)
    }

    pub fn verification(&self, to: &str, token: &str) -> Result<Notification, AuthError> {
        let link = self.verify_link(token)?;
        Ok(Notification {
            to: to.to_string(),
            subject: "Confirm your email".to_string(),
            body_html: format!("<p>Click to confirm your email: <a href=\"{link}\">Confirm</a></p>"),
        })
    }

    pub fn password_reset(&self, to: &str, token: &str) -> Result<Notification, AuthError> {
        let link = self.reset_link(token)?;
        Ok(Notification {
            to: to.to_string(),
            subject: "Password reset".to_string(),
            body_html: format!("<p>Reset your password: <a href=\"{link}\">link</a></p>"),
        })
    }

    fn link(&self, path: &str, token: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&format!("{}{}", self.base, path)).map_err(|e| AuthError::Validation(e.to_string()))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }
}

/// Pull the `token` query parameter back out of a mail body. Test helper for
/// driving flows off what was "delivered".
pub fn token_from_body(body_html: &str) -> Option<String> {
    let start = body_html.find("href=\"")? + "href=\"".len();
    let end = body_html[start..].find('"')? + start;
    let url = Url::parse(&body_html[start..end]).ok()?;
    url.query_pairs().find(|(k, _)| k == "token").map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_built_under_the_base_url() {
        let t = Templates::new("https://api.note2tex.app/").unwrap();
        assert_eq!(t.verify_link("abc").unwrap().as_str(), "https://api.note2tex.app/auth/verify?token=abc");
        assert_eq!(
            t.reset_link("a b+c").unwrap().as_str(),
            "https://api.note2tex.app/auth/reset/confirm?token=a+b%2Bc"
        );
    }

    #[test]
    fn mails_carry_subject_and_round_trippable_link() {
        let t = Templates::new("http://localhost:8080").unwrap();
        let n = t.verification("a@x.com", "tok-123_x").unwrap();
        assert_eq!(n.subject, "Confirm your email");
        assert_eq!(n.to, "a@x.com");
        assert_eq!(token_from_body(&n.body_html).as_deref(), Some("tok-123_x"));
        let n = t.password_reset("a@x.com", "r").unwrap();
        assert_eq!(n.subject, "Password reset");
        assert!(n.body_html.contains("/auth/reset/confirm?token=r"));
    }

    #[test]
    fn rejects_unparseable_base() {
        assert!(Templates::new("not a url").is_err());
    }
}
