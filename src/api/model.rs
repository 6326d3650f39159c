use crate::error::Error;
use crate::update::UpdateRequest;
use serde::Deserialize;

/// The query string of a DynDNS-style update request.
#[derive(Deserialize, Clone, Default, PartialEq, Eq)]
pub(super) struct UpdateQuery {
    pub username: Option<String>,
    pub password: Option<String>,
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub myip: Option<String>,
}

impl UpdateQuery {
    /// The reported address: the first non-empty of `ip` then `myip`.
    pub fn address(&self) -> Option<&str> {
        [&self.ip, &self.myip]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|v| !v.is_empty())
    }

    /// Build an [`UpdateRequest`], taking credentials missing from the query from the
    /// `Authorization: Basic` pair, if one was sent.
    pub fn into_request(
        self,
        basic_auth: Option<(String, String)>,
    ) -> Result<UpdateRequest, Error> {
        let address = self.address().map(str::to_string);
        let (basic_user, basic_pass) = basic_auth.unzip();
        let non_empty = |v: Option<String>| v.filter(|v| !v.is_empty());
        UpdateRequest::from_parts(
            non_empty(self.username).or(basic_user),
            non_empty(self.password).or(basic_pass),
            self.hostname,
            address,
        )
    }
}
