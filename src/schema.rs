// 📐 Shape Layer - Extraction Schema
// The structural contract handed to the model and checked on the way back

use serde_json::{json, Map, Value};

// ============================================================================
// FIELD TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Array,
    Object,
}

impl FieldType {
    /// Type name in the model's responseSchema dialect
    pub fn schema_name(&self) -> &str {
        match self {
            FieldType::String => "STRING",
            FieldType::Integer => "INTEGER",
            FieldType::Number => "NUMBER",
            FieldType::Array => "ARRAY",
            FieldType::Object => "OBJECT",
        }
    }

    /// Does a JSON value have this type?
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

// ============================================================================
// FIELD DEFINITION
// ============================================================================

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub type_: FieldType,
    pub description: String,
    pub required: bool,

    /// Element fields, for arrays of objects
    pub item_fields: Vec<FieldDefinition>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, type_: FieldType) -> Self {
        FieldDefinition {
            name: name.into(),
            type_,
            description: String::new(),
            required: false,
            item_fields: Vec::new(),
        }
    }

    /// Builder: add description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Builder: add an element field (array of objects)
    pub fn with_item_field(mut self, field: FieldDefinition) -> Self {
        self.item_fields.push(field);
        self
    }

    fn to_schema_value(&self) -> Value {
        let mut node = Map::new();
        node.insert("type".to_string(), json!(self.type_.schema_name()));
        if !self.description.is_empty() {
            node.insert("description".to_string(), json!(self.description));
        }

        if self.type_ == FieldType::Array && !self.item_fields.is_empty() {
            node.insert("items".to_string(), object_schema(&self.item_fields));
        }

        Value::Object(node)
    }
}

fn object_schema(fields: &[FieldDefinition]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|f| (f.name.clone(), f.to_schema_value()))
        .collect();

    let required: Vec<&str> = fields
        .iter()
        .filter(|f| f.required)
        .map(|f| f.name.as_str())
        .collect();

    json!({
        "type": FieldType::Object.schema_name(),
        "properties": properties,
        "required": required,
    })
}

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

// ============================================================================
// EXTRACTION SCHEMA
// ============================================================================

/// ExtractionSchema - the expected shape of a parsed receipt.
///
/// Sent to the model as a response constraint. After the call only a
/// shallow check of the top-level fields is made (see `validate_shape`).
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    fields: Vec<FieldDefinition>,
}

impl ExtractionSchema {
    /// The receipt schema
    pub fn receipt() -> Self {
        let item = |name: &str, type_: FieldType, desc: &str| {
            FieldDefinition::new(name, type_).with_description(desc).required()
        };

        ExtractionSchema {
            fields: vec![
                FieldDefinition::new("storeName", FieldType::String)
                    .with_description("The name of the store or vendor.")
                    .required(),
                FieldDefinition::new("transactionDate", FieldType::String)
                    .with_description("The date of the transaction in YYYY-MM-DD format.")
                    .required(),
                FieldDefinition::new("total", FieldType::Number)
                    .with_description("The final total amount of the transaction.")
                    .required(),
                FieldDefinition::new("items", FieldType::Array)
                    .with_description("A list of items purchased.")
                    .required()
                    .with_item_field(item("name", FieldType::String, "The name of the item."))
                    .with_item_field(item(
                        "quantity",
                        FieldType::Integer,
                        "The quantity of the item purchased.",
                    ))
                    .with_item_field(item(
                        "price",
                        FieldType::Number,
                        "The price of a single unit of the item.",
                    )),
            ],
        }
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render as the model's `responseSchema` object
    pub fn to_response_schema(&self) -> Value {
        object_schema(&self.fields)
    }

    /// Shallow check: every required top-level field is present with the
    /// declared type. Array elements are not inspected here.
    pub fn validate_shape(&self, value: &Value) -> ValidationResult {
        let object = match value.as_object() {
            Some(o) => o,
            None => {
                return Err(vec![ValidationError {
                    field: "$".to_string(),
                    message: "Expected a JSON object".to_string(),
                }])
            }
        };

        let mut errors = Vec::new();

        for field in self.fields.iter().filter(|f| f.required) {
            match object.get(&field.name) {
                None | Some(Value::Null) => errors.push(ValidationError {
                    field: field.name.clone(),
                    message: "Required field is missing".to_string(),
                }),
                Some(v) if !field.type_.matches(v) => errors.push(ValidationError {
                    field: field.name.clone(),
                    message: format!("Expected {}", field.type_.schema_name()),
                }),
                Some(_) => {}
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ExtractionSchema {
    fn default() -> Self {
        Self::receipt()
    }
}
