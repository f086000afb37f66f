//! Table layouts from configuration.

use std::collections::HashSet;

use celldex_data::{ColumnDef, RowMetadata, TypeTag};

use crate::{ConfigError, RawColumn, RawTable};

impl RawTable {
    /// Resolves the declared columns into row metadata.
    ///
    /// Column types are parsed with the storage engine's type syntax and
    /// column names must be unique across the three groups.
    pub fn to_metadata(&self) -> Result<RowMetadata, ConfigError> {
        let mut seen = HashSet::new();
        let mut resolve = |columns: &[RawColumn]| -> Result<Vec<ColumnDef>, ConfigError> {
            columns
                .iter()
                .map(|column| {
                    if !seen.insert(column.name.clone()) {
                        return Err(ConfigError::DuplicateColumn {
                            column: column.name.clone(),
                        });
                    }
                    let declared_type: TypeTag =
                        column
                            .type_name
                            .parse()
                            .map_err(|source| ConfigError::InvalidColumnType {
                                column: column.name.clone(),
                                source,
                            })?;
                    Ok(ColumnDef::new(column.name.clone(), declared_type))
                })
                .collect()
        };

        let partition_key = resolve(&self.partition_key)?;
        let clustering_key = resolve(&self.clustering_key)?;
        let regular = resolve(&self.columns)?;
        Ok(RowMetadata::new(partition_key, clustering_key, regular))
    }
}
