use url::Url;

use crate::error::UpstairsError;

const UPSTAIRS_PREFIX: &str = "portofino-upstairs";

/// URL builder for the `portofino-upstairs` REST resources under an API root.
///
/// Every dynamic segment is percent-encoded, so names containing `/` or
/// spaces stay one path segment.
#[derive(Debug, Clone)]
pub struct UpstairsEndpoints {
    base: Url,
}

impl UpstairsEndpoints {
    pub fn new(api_root: &Url) -> Result<Self, UpstairsError> {
        let mut base = api_root.clone();
        base.set_query(None);
        base.set_fragment(None);
        base.path_segments_mut()
            .map_err(|()| UpstairsError::InvalidApiRoot(api_root.to_string()))?
            .pop_if_empty()
            .push(UPSTAIRS_PREFIX);
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn connections(&self) -> Url {
        self.url(&["database", "connections"])
    }

    pub fn connection(&self, name: &str) -> Url {
        self.url(&["database", "connections", name])
    }

    pub fn test_connection(&self, name: &str) -> Url {
        self.url(&["database", "connections", name, ":test"])
    }

    pub fn synchronize_connection(&self, name: &str) -> Url {
        self.url(&["database", "connections", name, ":synchronize"])
    }

    pub fn platforms(&self) -> Url {
        self.url(&["database", "platforms"])
    }

    pub fn tables(&self, database: &str, schema: &str) -> Url {
        self.url(&["database", "tables", database, schema])
    }

    pub fn table(&self, database: &str, schema: &str, table: &str) -> Url {
        self.url(&["database", "tables", database, schema, table])
    }

    pub fn column(&self, database: &str, schema: &str, table: &str, column: &str) -> Url {
        self.url(&["database", "tables", database, schema, table, column])
    }

    pub fn column_annotations(
        &self,
        database: &str,
        schema: &str,
        table: &str,
        column: &str,
        java_type: &str,
    ) -> Url {
        self.url(&[
            "database",
            "tables",
            database,
            schema,
            table,
            column,
            ":annotations",
            java_type,
        ])
    }

    pub fn settings(&self) -> Url {
        self.url(&["settings"])
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` already proved the base can hold path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }
}
