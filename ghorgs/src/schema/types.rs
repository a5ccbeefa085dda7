/// Name of the pseudo-field that addresses a record's key.
pub const ID_NAME: &str = "Id";

/// A named column with a fixed position in every row of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub index: usize,
}

/// The field a query or sort operates on, resolved from a field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pivot<'a> {
    /// The record key itself.
    Id,
    /// A stored column of the schema.
    Field(&'a Field),
}

impl<'a> Pivot<'a> {
    /// The text this pivot selects from a keyed row.
    pub fn cell<'r>(&self, key: &'r str, row: &'r [String]) -> &'r str {
        match self {
            Pivot::Id => key,
            Pivot::Field(field) => row[field.index].as_str(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Pivot::Id => ID_NAME,
            Pivot::Field(field) => field.name.as_str(),
        }
    }
}

/// Ordered set of fields describing every row of a table.
///
/// Field indexes are assigned from position and never change, so a schema
/// can be shared between a table and everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Field {
                name: name.into(),
                index,
            })
            .collect();
        Schema { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Resolve a field name to a pivot.
    ///
    /// `Id` always resolves to the record key, even when the schema also
    /// declares a column with that name. Unknown names resolve to `None`.
    pub fn resolve(&self, name: &str) -> Option<Pivot<'_>> {
        if name == ID_NAME {
            return Some(Pivot::Id);
        }
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(Pivot::Field)
    }
}
