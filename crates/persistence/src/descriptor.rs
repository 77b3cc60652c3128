//! JSON descriptor parsing.
//!
//! Turns the relational-mapper argument shape callers already speak
//! (`where`, `include`, `select`, `orderBy`, `take`, `skip`, `data`) into
//! the typed descriptors the façade runs. Relation names are checked
//! against the entity's relation table while parsing, so a bad descriptor
//! fails before any store call.
//!
//! ```
//! use hms_persistence::descriptor::Query;
//! use hms_persistence::schema::Entity;
//! use serde_json::json;
//!
//! let query = Query::parse(
//!     Entity::Appointment,
//!     "findMany",
//!     &json!({
//!         "where": {"status": {"in": ["PENDING", "CONFIRMED"]}},
//!         "orderBy": {"startsAt": "desc"},
//!         "take": 5,
//!         "include": {"doctor": {"include": {"user": true}}}
//!     }),
//! )
//! .unwrap();
//! assert!(matches!(query, Query::FindMany(_)));
//!
//! let err = Query::parse(Entity::Appointment, "findMany", &json!({"include": {"ward": true}}));
//! assert!(err.is_err());
//! ```

use serde_json::{Map, Number, Value};

use crate::client::EntityHandler;
use crate::error::{StorageResult, ValidationError};
use crate::schema::Entity;
use crate::types::{
    Condition, CreateArgs, FieldMask, FieldUpdate, Filter, FindManyArgs, FindUniqueArgs,
    RelationArgs, Shape, SortDirection, SortDirective, UniqueWhere, UpdateArgs, UpdateData, negate,
};

type ParseResult<T> = Result<T, ValidationError>;

/// A parsed façade call.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// `findUnique`.
    FindUnique(FindUniqueArgs),
    /// `findFirst`.
    FindFirst(FindManyArgs),
    /// `findMany`.
    FindMany(FindManyArgs),
    /// `create`.
    Create(CreateArgs),
    /// `update`.
    Update(UpdateArgs),
    /// `updateMany`.
    UpdateMany {
        /// Documents to change.
        filter: Filter,
        /// Partial merge.
        data: UpdateData,
    },
    /// `delete`.
    Delete(UniqueWhere),
    /// `deleteMany`.
    DeleteMany(Filter),
    /// `count`.
    Count(Filter),
}

impl Query {
    /// Parses the arguments of `operation` (camelCase or snake_case) for
    /// `entity`. `null` arguments are treated as `{}`.
    pub fn parse(entity: Entity, operation: &str, args: &Value) -> ParseResult<Self> {
        let empty = Map::new();
        let args = match args {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => return Err(invalid("", format!("expected an object, got {}", other))),
        };
        let op = operation.replace('_', "").to_ascii_lowercase();
        match op.as_str() {
            "findunique" => Ok(Query::FindUnique(parse_find_unique(entity, args)?)),
            "findfirst" => Ok(Query::FindFirst(parse_find_many(entity, args)?)),
            "findmany" => Ok(Query::FindMany(parse_find_many(entity, args)?)),
            "create" => Ok(Query::Create(parse_create(entity, args)?)),
            "update" => Ok(Query::Update(parse_update(entity, args)?)),
            "updatemany" => {
                allow_keys(args, "", &["where", "data"])?;
                Ok(Query::UpdateMany {
                    filter: parse_where(args.get("where"), "where")?,
                    data: parse_update_data(required(args, "data")?, "data")?,
                })
            }
            "delete" => {
                allow_keys(args, "", &["where"])?;
                Ok(Query::Delete(parse_unique_where(required(args, "where")?, "where")?))
            }
            "deletemany" => {
                allow_keys(args, "", &["where"])?;
                Ok(Query::DeleteMany(parse_where(args.get("where"), "where")?))
            }
            "count" => {
                allow_keys(args, "", &["where"])?;
                Ok(Query::Count(parse_where(args.get("where"), "where")?))
            }
            _ => Err(invalid("", format!("unknown operation '{}'", operation))),
        }
    }

    /// Runs the query on `handler` and renders the result as JSON.
    ///
    /// Single-document operations yield the document or `null`, list
    /// operations an array, and the bulk and count operations
    /// `{"count": n}`.
    pub async fn execute(self, handler: &EntityHandler<'_>) -> StorageResult<Value> {
        let one = |doc: Option<Map<String, Value>>| doc.map_or(Value::Null, Value::Object);
        let count = |n: u64| {
            let mut body = Map::new();
            body.insert("count".to_string(), Value::from(n));
            Value::Object(body)
        };
        Ok(match self {
            Query::FindUnique(args) => one(handler.find_unique(args).await?),
            Query::FindFirst(args) => one(handler.find_first(args).await?),
            Query::FindMany(args) => Value::Array(
                handler
                    .find_many(args)
                    .await?
                    .into_iter()
                    .map(Value::Object)
                    .collect(),
            ),
            Query::Create(args) => Value::Object(handler.create(args).await?),
            Query::Update(args) => one(handler.update(args).await?),
            Query::UpdateMany { filter, data } => count(handler.update_many(filter, data).await?),
            Query::Delete(criteria) => one(handler.delete(criteria).await?),
            Query::DeleteMany(filter) => count(handler.delete_many(filter).await?),
            Query::Count(filter) => count(handler.count(filter).await?),
        })
    }
}

/// Parses `findUnique` arguments.
pub fn parse_find_unique(entity: Entity, args: &Map<String, Value>) -> ParseResult<FindUniqueArgs> {
    allow_keys(args, "", &["where", "select", "include"])?;
    Ok(FindUniqueArgs {
        criteria: parse_unique_where(required(args, "where")?, "where")?,
        shape: parse_shape(entity, args, "")?,
    })
}

/// Parses `findMany` / `findFirst` arguments.
pub fn parse_find_many(entity: Entity, args: &Map<String, Value>) -> ParseResult<FindManyArgs> {
    allow_keys(args, "", &["where", "orderBy", "take", "skip", "select", "include"])?;
    Ok(FindManyArgs {
        filter: parse_where(args.get("where"), "where")?,
        order_by: parse_order_by(args.get("orderBy"), "orderBy")?,
        take: parse_count(args.get("take"), "take")?,
        skip: parse_count(args.get("skip"), "skip")?,
        shape: parse_shape(entity, args, "")?,
    })
}

/// Parses `create` arguments.
pub fn parse_create(entity: Entity, args: &Map<String, Value>) -> ParseResult<CreateArgs> {
    allow_keys(args, "", &["data", "select", "include"])?;
    let data = match required(args, "data")? {
        Value::Object(data) => data.clone(),
        other => return Err(invalid("data", format!("expected an object, got {}", other))),
    };
    Ok(CreateArgs {
        data,
        shape: parse_shape(entity, args, "")?,
    })
}

/// Parses `update` arguments.
pub fn parse_update(entity: Entity, args: &Map<String, Value>) -> ParseResult<UpdateArgs> {
    allow_keys(args, "", &["where", "data", "select", "include"])?;
    Ok(UpdateArgs {
        criteria: parse_unique_where(required(args, "where")?, "where")?,
        data: parse_update_data(required(args, "data")?, "data")?,
        shape: parse_shape(entity, args, "")?,
    })
}

/// Parses unique criteria. An `id` key takes priority over the rest.
pub fn parse_unique_where(value: &Value, path: &str) -> ParseResult<UniqueWhere> {
    let map = as_object(value, path)?;
    match map.get("id") {
        Some(Value::String(id)) => Ok(UniqueWhere::id(id.clone())),
        // non-string ids can never match
        Some(_) => Ok(UniqueWhere::filter(Filter::Never)),
        None => {
            let filter = parse_where(Some(value), path)?;
            if filter.is_all() {
                return Err(invalid(path, "unique criteria must name at least one field"));
            }
            Ok(UniqueWhere::filter(filter))
        }
    }
}

/// Parses a `where` object. Absent or `null` matches everything.
pub fn parse_where(value: Option<&Value>, path: &str) -> ParseResult<Filter> {
    let map = match value {
        None | Some(Value::Null) => return Ok(Filter::All),
        Some(value) => as_object(value, path)?,
    };

    let mut parts = Vec::with_capacity(map.len());
    for (key, value) in map {
        let here = join(path, key);
        let part = match key.as_str() {
            "AND" => Filter::And(parse_where_list(value, &here)?),
            "OR" => match value {
                Value::Array(_) => Filter::Or(parse_where_list(value, &here)?),
                _ => return Err(invalid(&here, "expected an array")),
            },
            "NOT" => Filter::And(parse_where_list(value, &here)?).negate(),
            field => parse_field(field, value, &here)?,
        };
        parts.push(part);
    }
    Ok(Filter::And(parts).simplify())
}

fn parse_where_list(value: &Value, path: &str) -> ParseResult<Vec<Filter>> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_where(Some(item), &format!("{}[{}]", path, i)))
            .collect(),
        Value::Object(_) => Ok(vec![parse_where(Some(value), path)?]),
        _ => Err(invalid(path, "expected an object or an array")),
    }
}

const OPERATORS: &[&str] = &[
    "equals",
    "not",
    "in",
    "notIn",
    "lt",
    "lte",
    "gt",
    "gte",
    "contains",
    "startsWith",
    "endsWith",
    "mode",
];

fn parse_field(field: &str, value: &Value, path: &str) -> ParseResult<Filter> {
    let Value::Object(ops) = value else {
        return Ok(Filter::eq(field, value.clone()));
    };
    let known = ops.keys().filter(|k| OPERATORS.contains(&k.as_str())).count();
    if known == 0 {
        // embedded document (or identifier object) equality
        return Ok(Filter::eq(field, value.clone()));
    }
    if known != ops.len() {
        let unknown: Vec<_> = ops
            .keys()
            .filter(|k| !OPERATORS.contains(&k.as_str()))
            .collect();
        return Err(invalid(path, format!("unknown operators {:?}", unknown)));
    }

    let case_insensitive = match ops.get("mode") {
        None => false,
        Some(Value::String(mode)) if mode == "insensitive" => true,
        Some(Value::String(mode)) if mode == "default" => false,
        Some(other) => return Err(invalid(&join(path, "mode"), format!("unknown mode {}", other))),
    };

    let mut parts = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let here = join(path, op);
        let condition = match op.as_str() {
            "mode" => continue,
            "equals" => Condition::Equals(operand.clone()),
            "not" => {
                if let Value::Object(_) = operand {
                    parts.push(parse_field(field, operand, &here)?.negate());
                    continue;
                }
                Condition::NotEquals(operand.clone())
            }
            "in" => Condition::In(as_array(operand, &here)?.to_vec()),
            "notIn" => Condition::NotIn(as_array(operand, &here)?.to_vec()),
            "lt" => Condition::Lt(operand.clone()),
            "lte" => Condition::Lte(operand.clone()),
            "gt" => Condition::Gt(operand.clone()),
            "gte" => Condition::Gte(operand.clone()),
            "contains" => Condition::Contains {
                value: as_str(operand, &here)?.to_string(),
                case_insensitive,
            },
            "startsWith" => Condition::StartsWith {
                value: as_str(operand, &here)?.to_string(),
                case_insensitive,
            },
            "endsWith" => Condition::EndsWith {
                value: as_str(operand, &here)?.to_string(),
                case_insensitive,
            },
            _ => unreachable!("operator list checked above"),
        };
        parts.push(Filter::field(field, condition));
    }
    Ok(Filter::And(parts).simplify())
}

fn parse_order_by(value: Option<&Value>, path: &str) -> ParseResult<Vec<SortDirective>> {
    let entry = |map: &Map<String, Value>, path: &str| -> ParseResult<Vec<SortDirective>> {
        map.iter()
            .map(|(field, direction)| match direction {
                Value::String(d) => Ok(SortDirective::new(field.clone(), SortDirection::parse(d))),
                other => Err(invalid(
                    &join(path, field),
                    format!("expected \"asc\" or \"desc\", got {}", other),
                )),
            })
            .collect()
    };
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => entry(map, path),
        Some(Value::Array(items)) => {
            let mut sort = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let here = format!("{}[{}]", path, i);
                sort.extend(entry(as_object(item, &here)?, &here)?);
            }
            Ok(sort)
        }
        Some(other) => Err(invalid(path, format!("expected an object or array, got {}", other))),
    }
}

fn parse_count(value: Option<&Value>, path: &str) -> ParseResult<Option<u64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(path, format!("expected a non-negative integer, got {}", n))),
        Some(other) => Err(invalid(path, format!("expected a non-negative integer, got {}", other))),
    }
}

// `select` and `include` of one level. Relation names inside `select` are
// treated as includes.
fn parse_shape(entity: Entity, args: &Map<String, Value>, path: &str) -> ParseResult<Shape> {
    let mut shape = Shape::default();

    if let Some(select) = args.get("select").filter(|v| !v.is_null()) {
        let here = join(path, "select");
        let mut mask = FieldMask::new();
        for (name, value) in as_object(select, &here)? {
            let field_path = join(&here, name);
            if entity.relation(name).is_some() {
                if let Some(relation_args) = parse_relation_entry(entity, name, value, &field_path)? {
                    shape.include.insert(name.clone(), relation_args);
                }
                continue;
            }
            match value {
                Value::Bool(true) => mask = mask.with_field(name.clone()),
                Value::Bool(false) => {}
                other => {
                    return Err(invalid(
                        &field_path,
                        format!("expected a boolean for a scalar field, got {}", other),
                    ));
                }
            }
        }
        shape.select = Some(mask);
    }

    if let Some(include) = args.get("include").filter(|v| !v.is_null()) {
        let here = join(path, "include");
        for (name, value) in as_object(include, &here)? {
            if let Some(relation_args) = parse_relation_entry(entity, name, value, &join(&here, name))? {
                shape.include.insert(name.clone(), relation_args);
            }
        }
    }

    Ok(shape)
}

fn parse_relation_entry(
    entity: Entity,
    name: &str,
    value: &Value,
    path: &str,
) -> ParseResult<Option<RelationArgs>> {
    let relation = entity.require_relation(name)?;
    match value {
        Value::Bool(true) => Ok(Some(RelationArgs::new())),
        Value::Bool(false) => Ok(None),
        Value::Object(args) => {
            allow_keys(args, path, &["where", "orderBy", "take", "skip", "select", "include"])?;
            let to_many_only = ["where", "orderBy", "take", "skip"];
            if !relation.kind.is_to_many()
                && let Some(key) = to_many_only.iter().find(|k| args.contains_key(**k))
            {
                return Err(invalid(
                    &join(path, key),
                    format!("'{}' is only allowed on to-many relations", key),
                ));
            }
            Ok(Some(RelationArgs {
                filter: parse_where(args.get("where"), &join(path, "where"))?,
                order_by: parse_order_by(args.get("orderBy"), &join(path, "orderBy"))?,
                take: parse_count(args.get("take"), &join(path, "take"))?,
                skip: parse_count(args.get("skip"), &join(path, "skip"))?,
                shape: parse_shape(relation.target, args, path)?,
            }))
        }
        other => Err(invalid(path, format!("expected a boolean or an object, got {}", other))),
    }
}

/// Parses update `data`. Operator objects (`{"increment": 1}`,
/// `{"decrement": 2}`, `{"set": v}`) map onto field changes; any other value
/// is a plain set.
pub fn parse_update_data(value: &Value, path: &str) -> ParseResult<UpdateData> {
    let mut data = UpdateData::new();
    for (field, value) in as_object(value, path)? {
        let here = join(path, field);
        let change = match value {
            Value::Object(op) if op.len() == 1 => match op.iter().next() {
                Some((key, operand)) if key == "set" => FieldUpdate::Set(operand.clone()),
                Some((key, operand)) if key == "increment" => {
                    FieldUpdate::Increment(as_number(operand, &join(&here, key))?.clone())
                }
                Some((key, operand)) if key == "decrement" => {
                    let by = as_number(operand, &join(&here, key))?;
                    FieldUpdate::Increment(negate(by))
                }
                _ => FieldUpdate::Set(value.clone()),
            },
            other => FieldUpdate::Set(other.clone()),
        };
        data.push(field.clone(), change);
    }
    Ok(data)
}

fn allow_keys(map: &Map<String, Value>, path: &str, allowed: &[&str]) -> ParseResult<()> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(invalid(
            &join(path, key),
            format!("unexpected key (allowed: {})", allowed.join(", ")),
        )),
        None => Ok(()),
    }
}

fn required<'v>(map: &'v Map<String, Value>, key: &str) -> ParseResult<&'v Value> {
    map.get(key)
        .ok_or_else(|| invalid(key, "required argument is missing"))
}

fn as_object<'v>(value: &'v Value, path: &str) -> ParseResult<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| invalid(path, format!("expected an object, got {}", value)))
}

fn as_array<'v>(value: &'v Value, path: &str) -> ParseResult<&'v [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| invalid(path, format!("expected an array, got {}", value)))
}

fn as_str<'v>(value: &'v Value, path: &str) -> ParseResult<&'v str> {
    value
        .as_str()
        .ok_or_else(|| invalid(path, format!("expected a string, got {}", value)))
}

fn as_number<'v>(value: &'v Value, path: &str) -> ParseResult<&'v Number> {
    match value {
        Value::Number(n) => Ok(n),
        other => Err(invalid(path, format!("expected a number, got {}", other))),
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn invalid(path: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidDescriptor {
        path: path.to_string(),
        message: message.into(),
    }
}
