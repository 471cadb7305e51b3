//! Secondary-index query condition builder.
//!
//! Conditions are appended in order and joined by implicit AND. Tag values
//! have index-reserved characters escaped with a backslash before they are
//! embedded, so `com.acme:lib` is written as `com\.acme\:lib`.

use std::fmt;

/// Query matching every document of an index.
pub const WILDCARD: &str = "*";

/// Separator between compound key components.
pub const KEY_DELIMITER: &str = ":";

/// Suffix appended to a collection name to form its index name.
pub const INDEX_SUFFIX: &str = ":index";

/// Field aliases shared by every collection.
pub mod fields {
    pub const ID: &str = "id";
    pub const GROUP_ID: &str = "groupId";
    pub const ARTIFACT_ID: &str = "artifactId";
    pub const VERSION_ID: &str = "versionId";
    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";
}

/// Index name for a collection.
pub fn index_name(collection: &str) -> String {
    format!("{collection}{INDEX_SUFFIX}")
}

/// Key prefix covered by a collection's index.
pub fn key_prefix(collection: &str) -> String {
    format!("{collection}{KEY_DELIMITER}")
}

/// Join key components with the key delimiter.
pub fn compound_key(components: &[&str]) -> String {
    components.join(KEY_DELIMITER)
}

fn is_reserved(c: char) -> bool {
    matches!(
        c,
        '-' | ':' | '.' | '{' | '}' | '|' | '*' | '\\' | ' ' | '(' | ')' | '@' | '[' | ']'
    )
}

/// Escape index-reserved characters in a tag value.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if is_reserved(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds a textual filter from typed predicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QueryBuilder {
    query: String,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact match on a tag field.
    pub fn equal(mut self, field: &str, value: &str) -> Self {
        self.push_tag(field, &escape(value), false);
        self
    }

    /// Exact match of a boolean tag.
    pub fn flag(mut self, field: &str, value: bool) -> Self {
        self.push_tag(field, if value { "true" } else { "false" }, false);
        self
    }

    /// Negated exact match on a tag field.
    pub fn not_equal(mut self, field: &str, value: &str) -> Self {
        self.push_tag(field, &escape(value), true);
        self
    }

    /// Tag prefix match.
    pub fn prefix(mut self, field: &str, value: &str) -> Self {
        let pattern = format!("{}*", escape(value));
        self.push_tag(field, &pattern, false);
        self
    }

    /// Numeric `field < bound`.
    pub fn less_than(mut self, field: &str, bound: impl fmt::Display) -> Self {
        self.query.push_str(&format!("@{field}:[-inf ({bound}] "));
        self
    }

    /// Numeric `field <= bound`.
    pub fn less_than_or_equal(mut self, field: &str, bound: impl fmt::Display) -> Self {
        self.query.push_str(&format!("@{field}:[-inf {bound}] "));
        self
    }

    /// Numeric `field >= bound`.
    pub fn greater_than_or_equal(mut self, field: &str, bound: impl fmt::Display) -> Self {
        self.query.push_str(&format!("@{field}:[{bound} inf] "));
        self
    }

    /// Match any of the given condition groups. An empty list adds nothing.
    pub fn any_of(mut self, groups: &[QueryBuilder]) -> Self {
        if groups.is_empty() {
            return self;
        }
        self.query.push('(');
        for group in groups {
            self.query.push_str(" ( ");
            self.query.push_str(&group.query);
            self.query.push_str(") |");
        }
        // drop the operator after the last group
        self.query.pop();
        self.query.push_str(") ");
        self
    }

    /// `groupId` and `artifactId` equality.
    pub fn artifact(self, group_id: &str, artifact_id: &str) -> Self {
        self.equal(fields::GROUP_ID, group_id)
            .equal(fields::ARTIFACT_ID, artifact_id)
    }

    /// `groupId`, `artifactId` and `versionId` equality.
    pub fn artifact_version(self, group_id: &str, artifact_id: &str, version_id: &str) -> Self {
        self.artifact(group_id, artifact_id)
            .equal(fields::VERSION_ID, version_id)
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }

    /// The filter string. An empty builder matches everything.
    pub fn build(self) -> String {
        if self.query.is_empty() {
            WILDCARD.to_string()
        } else {
            self.query
        }
    }

    fn push_tag(&mut self, field: &str, value: &str, negate: bool) {
        if negate {
            self.query.push('-');
        }
        self.query.push('@');
        self.query.push_str(field);
        self.query.push_str(":{ ");
        self.query.push_str(value);
        self.query.push_str(" } ");
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            f.write_str(WILDCARD)
        } else {
            f.write_str(&self.query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equal_escapes_reserved_characters() {
        let query = QueryBuilder::new().equal("groupId", "com.acme:lib").build();
        assert_eq!(query, "@groupId:{ com\\.acme\\:lib } ");
    }

    #[test]
    fn test_not_equal_has_a_single_field_marker() {
        let query = QueryBuilder::new()
            .not_equal("versionId", "master-SNAPSHOT")
            .build();
        assert_eq!(query, "-@versionId:{ master\\-SNAPSHOT } ");
    }

    #[test]
    fn test_numeric_ranges() {
        assert_eq!(
            QueryBuilder::new().less_than("lastQueryTime", 10).build(),
            "@lastQueryTime:[-inf (10] "
        );
        assert_eq!(
            QueryBuilder::new().less_than_or_equal("updated", 10).build(),
            "@updated:[-inf 10] "
        );
        assert_eq!(
            QueryBuilder::new().greater_than_or_equal("updated", 5).build(),
            "@updated:[5 inf] "
        );
    }

    #[test]
    fn test_prefix_keeps_wildcard_unescaped() {
        let query = QueryBuilder::new()
            .prefix("entity_content_package", "model::domain")
            .build();
        assert_eq!(query, "@entity_content_package:{ model\\:\\:domain* } ");
    }

    #[test]
    fn test_any_of_strips_trailing_operator() {
        let groups = vec![
            QueryBuilder::new().equal("groupId", "a"),
            QueryBuilder::new().equal("groupId", "b"),
        ];
        let query = QueryBuilder::new().any_of(&groups).build();
        assert_eq!(query, "( ( @groupId:{ a } ) | ( @groupId:{ b } ) ) ");
    }

    #[test]
    fn test_any_of_empty_adds_nothing() {
        let query = QueryBuilder::new().any_of(&[]);
        assert!(query.is_empty());
        assert_eq!(query.build(), WILDCARD);
    }

    #[test]
    fn test_artifact_version_filter() {
        let query = QueryBuilder::new().artifact_version("g", "a", "1.0.0").build();
        assert_eq!(
            query,
            "@groupId:{ g } @artifactId:{ a } @versionId:{ 1\\.0\\.0 } "
        );
    }

    #[test]
    fn test_keys_and_index_names() {
        assert_eq!(index_name("entities"), "entities:index");
        assert_eq!(key_prefix("entities"), "entities:");
        assert_eq!(compound_key(&["projects", "g", "a"]), "projects:g:a");
    }

    proptest! {
        #[test]
        fn prop_builder_is_deterministic(
            predicates in proptest::collection::vec(("[a-zA-Z]{1,8}", "[ -~]{0,12}", 0u8..4), 0..8)
        ) {
            let build = || {
                predicates.iter().fold(QueryBuilder::new(), |q, (field, value, kind)| match kind {
                    0 => q.equal(field, value),
                    1 => q.not_equal(field, value),
                    2 => q.prefix(field, value),
                    _ => q.flag(field, value.len() % 2 == 0),
                })
            };
            prop_assert_eq!(build().build(), build().build());
        }

        #[test]
        fn prop_escaped_values_contain_no_bare_reserved_characters(value in "[ -~]{0,24}") {
            let escaped = escape(&value);
            let mut chars = escaped.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    prop_assert!(chars.next().is_some_and(is_reserved));
                } else {
                    prop_assert!(!is_reserved(c));
                }
            }
        }
    }
}
