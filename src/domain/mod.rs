use std::fmt;

/// Object identifier of a node in the BECS management tree.
pub type Oid = i64;

/// Root of the BECS object tree; queried when no oid is given.
pub const DEFAULT_OID: Oid = 1;

/// Classes included by default in a tree query.
pub const DEFAULT_CLASSMASK: &str = "element-attach,interface,resource-inet";

/// Opaque tree returned by `objectTreeFind`. Never inspected, only re-serialized.
pub type QueryResult = serde_json::Value;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session id handed out by `sessionLogin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Parameters of one `objectTreeFind` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFindRequest {
    pub oid: Oid,
    pub classmask: String,
    pub walkdown: u32,
}

impl TreeFindRequest {
    pub fn new(oid: Oid) -> Self {
        Self {
            oid,
            classmask: DEFAULT_CLASSMASK.to_string(),
            walkdown: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_find_defaults_match_element_listing() {
        let req = TreeFindRequest::new(108871);
        assert_eq!(req.oid, 108871);
        assert_eq!(req.classmask, "element-attach,interface,resource-inet");
        assert_eq!(req.walkdown, 0);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = Credentials {
            username: "u".into(),
            password: "hunter2".into(),
        };
        let dbg = format!("{:?}", c);
        assert!(dbg.contains("\"u\""));
        assert!(!dbg.contains("hunter2"));
    }
}
