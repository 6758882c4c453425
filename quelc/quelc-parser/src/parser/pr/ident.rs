use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A dotted identifier chain, such as `p.price`.
///
/// Semantic elaboration binds `range` to the name of the range the head
/// refers to and pops the head off `parts`; ranges are identified by name
/// rather than by reference to keep the tree free of ownership cycles. After
/// elaboration an identifier is entity-typed when `parts` is empty and
/// property-typed when a single part remains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    pub parts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub range: Option<String>,
}

impl Ident {
    pub fn from_name<S: ToString>(name: S) -> Self {
        Ident {
            parts: vec![name.to_string()],
            range: None,
        }
    }

    pub fn from_parts<S: ToString>(parts: Vec<S>) -> Self {
        Ident {
            parts: parts.into_iter().map(|x| x.to_string()).collect(),
            range: None,
        }
    }

    /// A property reference already bound to a range.
    pub fn bound<S: ToString>(range: S, property: S) -> Self {
        Ident {
            parts: vec![property.to_string()],
            range: Some(range.to_string()),
        }
    }

    /// The first unbound part of the chain.
    pub fn head(&self) -> Option<&str> {
        if self.range.is_some() {
            None
        } else {
            self.parts.first().map(|s| s.as_str())
        }
    }

    /// The property this identifier selects, once bound to a range.
    pub fn property(&self) -> Option<&str> {
        if self.range.is_some() && self.parts.len() == 1 {
            self.parts.first().map(|s| s.as_str())
        } else {
            None
        }
    }

    /// Whether this identifier names a whole entity rather than a property.
    pub fn is_entity_ref(&self) -> bool {
        self.range.is_some() && self.parts.is_empty()
    }

    /// Bind the head of the chain to a range.
    pub fn bind<S: ToString>(&mut self, range: S) {
        self.range = Some(range.to_string());
        if !self.parts.is_empty() {
            self.parts.remove(0);
        }
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.range {
            Some(range) => {
                write!(f, "{range}")?;
                for part in &self.parts {
                    write!(f, ".{part}")?;
                }
                Ok(())
            }
            None => write!(f, "{}", self.parts.iter().join(".")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bind() {
        let mut ident = Ident::from_parts(vec!["p", "price"]);
        assert_eq!(ident.head(), Some("p"));
        assert_eq!(ident.property(), None);

        ident.bind("p");
        assert_eq!(ident.head(), None);
        assert_eq!(ident.property(), Some("price"));
        assert!(!ident.is_entity_ref());
        assert_eq!(ident.to_string(), "p.price");

        let mut entity = Ident::from_name("p");
        entity.bind("P001");
        assert!(entity.is_entity_ref());
        assert_eq!(entity.to_string(), "P001");
    }
}
