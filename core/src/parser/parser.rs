use hashbrown::HashSet;
use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;

use super::error::{ParseError, ParseErrorKind, Span, convert_pest_error};
use crate::errors::{Error, Result};
use crate::types::{
    DefaultValue, EnumDef, FieldDecl, ScalarKind, Schema, TableDef, TypeDesc, UnionDef,
};

type ParseResult<T> = core::result::Result<T, ParseError>;

#[derive(Parser)]
#[grammar = "parser/schema.pest"]
pub struct SchemaParser;

/// Attributes every schema may use without declaring them.
pub const BUILTIN_ATTRIBUTES: &[&str] = &["required", "deprecated", "key"];

/// One parsed schema file, before names are resolved against other files.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaFile {
    /// Paths of `include` directives, as written.
    pub includes: Vec<String>,
    pub namespace: Option<String>,
    /// Names declared with `attribute "name";`.
    pub attributes: Vec<String>,
    pub tables: Vec<ParsedTable>,
    pub enums: Vec<EnumDef>,
    pub unions: Vec<UnionDef>,
    pub root_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub name: String,
    pub attributes: Vec<String>,
    pub fields: Vec<ParsedField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedField {
    pub name: String,
    pub ty: ParsedType,
    pub default: Option<DefaultValue>,
    pub attributes: Vec<String>,
}

impl ParsedField {
    fn is_required(&self) -> bool {
        self.attributes.iter().any(|a| a == "required")
    }
}

/// A field type as written. Names are unqualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedType {
    Named(String),
    Vector(String),
}

/// Parse one schema file. Its includes are listed but not followed.
pub fn parse_file(source: &str) -> ParseResult<SchemaFile> {
    let mut pairs = SchemaParser::parse(Rule::main, source).map_err(convert_pest_error)?;
    let main = pairs
        .next()
        .ok_or_else(|| missing_pair(Span::new(0, source.len())))?;

    let mut file = SchemaFile::default();
    let mut names: HashSet<String> = HashSet::new();
    for pair in main.into_inner() {
        let span = Span::from(pair.as_span());
        match pair.as_rule() {
            Rule::include => {
                let path = string_value(&mut pair.into_inner(), &span)?;
                file.includes.push(path);
            }
            Rule::namespace_decl => {
                if file.namespace.is_some() {
                    return Err(duplicate("namespace", span));
                }
                file.namespace = Some(next(&mut pair.into_inner(), &span)?.as_str().to_string());
            }
            Rule::attribute_decl => {
                let name = string_value(&mut pair.into_inner(), &span)?;
                if file.attributes.contains(&name) {
                    return Err(duplicate(&name, span));
                }
                file.attributes.push(name);
            }
            Rule::root_decl => {
                if file.root_type.is_some() {
                    return Err(duplicate("root_type", span));
                }
                let name = next(&mut pair.into_inner(), &span)?.as_str();
                file.root_type = Some(local_name(name).to_string());
            }
            Rule::table_def => {
                let table = parse_table(pair)?;
                claim(&mut names, &table.name, span)?;
                file.tables.push(table);
            }
            Rule::enum_def => {
                let def = parse_enum(pair)?;
                claim(&mut names, &def.name, span)?;
                file.enums.push(def);
            }
            Rule::union_def => {
                let def = parse_union(pair)?;
                claim(&mut names, &def.name, span)?;
                file.unions.push(def);
            }
            Rule::EOI => {}
            rule => {
                return Err(ParseError::new(
                    ParseErrorKind::Other {
                        message: format!("unexpected {rule:?}"),
                    },
                    span,
                ));
            }
        }
    }
    Ok(file)
}

/// Resolve the names of one or more parsed files into a single schema.
///
/// The first file is the root: its namespace and `root_type` become the
/// schema's. Definitions from every file share one name space.
pub fn lower(files: &[SchemaFile]) -> Result<Schema> {
    let mut enums = HashSet::new();
    let mut unions = HashSet::new();
    let mut attributes: HashSet<&str> = BUILTIN_ATTRIBUTES.iter().copied().collect();
    for file in files {
        enums.extend(file.enums.iter().map(|e| e.name.as_str()));
        unions.extend(file.unions.iter().map(|u| u.name.as_str()));
        attributes.extend(file.attributes.iter().map(String::as_str));
    }

    let mut schema = Schema::new();
    if let Some(root) = files.first() {
        if let Some(namespace) = &root.namespace {
            schema.set_namespace(namespace.clone());
        }
        if let Some(root_type) = &root.root_type {
            schema.set_root_type(root_type.clone());
        }
    }

    for file in files {
        for def in &file.enums {
            schema.add_enum(def.clone())?;
        }
        for def in &file.unions {
            schema.add_union(def.clone())?;
        }
        for table in &file.tables {
            check_attributes(&attributes, &table.name, &table.attributes)?;
            let mut def = TableDef::new(&table.name);
            for field in &table.fields {
                let context = format!("{}.{}", table.name, field.name);
                check_attributes(&attributes, &context, &field.attributes)?;
                let ty = resolve(&field.ty, field.is_required(), &enums, &unions);
                def.push_field(FieldDecl {
                    name: field.name.clone(),
                    ty,
                    default: field.default.clone(),
                });
            }
            schema.add_table(def)?;
        }
    }
    Ok(schema)
}

/// Parse a self-contained schema.
///
/// # Example
///
/// ```
/// use flatrecord_core::parser;
/// use flatrecord_core::types::TypeDesc;
///
/// let schema = parser::parse(r#"
///     namespace game;
///     table Monster { name: string (required); hp: short = 100; }
///     root_type Monster;
/// "#)?;
/// let monster = schema.table("Monster").unwrap();
/// assert_eq!(monster.fields[0].ty, TypeDesc::String);
/// assert_eq!(schema.root_type(), Some("Monster"));
/// # Ok::<(), flatrecord_core::Error>(())
/// ```
pub fn parse(source: &str) -> Result<Schema> {
    let file = parse_file(source)?;
    if let Some(path) = file.includes.first() {
        return Err(Error::mismatch(
            "include",
            format!("`{path}` must be loaded with `parse_file` and passed to `lower`"),
        ));
    }
    lower(&[file])
}

fn resolve(
    ty: &ParsedType,
    required: bool,
    enums: &HashSet<&str>,
    unions: &HashSet<&str>,
) -> TypeDesc {
    let optional = |ty: TypeDesc| {
        if required {
            ty
        } else {
            TypeDesc::optional(ty)
        }
    };
    match ty {
        ParsedType::Named(name) => {
            if let Some(kind) = ScalarKind::from_schema_name(name) {
                TypeDesc::Scalar(kind)
            } else if enums.contains(name.as_str()) {
                TypeDesc::enumeration(name.as_str())
            } else {
                optional(element(name, enums, unions))
            }
        }
        ParsedType::Vector(name) if name == "ubyte" || name == "uint8" => optional(TypeDesc::Bytes),
        ParsedType::Vector(name) => optional(TypeDesc::list(element(name, enums, unions))),
    }
}

fn element(name: &str, enums: &HashSet<&str>, unions: &HashSet<&str>) -> TypeDesc {
    if name == "string" {
        TypeDesc::String
    } else if let Some(kind) = ScalarKind::from_schema_name(name) {
        TypeDesc::Scalar(kind)
    } else if enums.contains(name) {
        TypeDesc::enumeration(name)
    } else if unions.contains(name) {
        TypeDesc::union(name)
    } else {
        // Unknown names are reported when the table is analyzed.
        TypeDesc::table(name)
    }
}

fn check_attributes(known: &HashSet<&str>, context: &str, attributes: &[String]) -> Result<()> {
    match attributes.iter().find(|a| !known.contains(a.as_str())) {
        Some(attr) => Err(Error::mismatch(
            context,
            format!("unknown attribute `{attr}`; declare it with `attribute \"{attr}\";`"),
        )),
        None => Ok(()),
    }
}

fn parse_table(pair: Pair<'_, Rule>) -> ParseResult<ParsedTable> {
    let span = Span::from(pair.as_span());
    let mut inner = pair.into_inner();
    let name = next(&mut inner, &span)?.as_str().to_string();

    let mut table = ParsedTable {
        name,
        attributes: Vec::new(),
        fields: Vec::new(),
    };
    let mut seen: HashSet<String> = HashSet::new();
    for pair in inner {
        let span = Span::from(pair.as_span());
        match pair.as_rule() {
            Rule::attributes => table.attributes = attribute_list(pair),
            Rule::field => {
                let field = parse_field(pair)?;
                claim(&mut seen, &field.name, span)?;
                table.fields.push(field);
            }
            _ => return Err(missing_pair(span)),
        }
    }
    Ok(table)
}

fn parse_field(pair: Pair<'_, Rule>) -> ParseResult<ParsedField> {
    let span = Span::from(pair.as_span());
    let mut inner = pair.into_inner();
    let name = next(&mut inner, &span)?.as_str().to_string();

    let type_pair = next(&mut inner, &span)?;
    let type_span = Span::from(type_pair.as_span());
    let written = next(&mut type_pair.into_inner(), &type_span)?;
    let ty = match written.as_rule() {
        Rule::vector_type => {
            let elem = next(&mut written.into_inner(), &type_span)?;
            ParsedType::Vector(local_name(elem.as_str()).to_string())
        }
        _ => ParsedType::Named(local_name(written.as_str()).to_string()),
    };

    let mut field = ParsedField {
        name,
        ty,
        default: None,
        attributes: Vec::new(),
    };
    for pair in inner {
        match pair.as_rule() {
            Rule::default_value => field.default = Some(parse_default(pair)?),
            Rule::attributes => field.attributes = attribute_list(pair),
            _ => return Err(missing_pair(Span::from(pair.as_span()))),
        }
    }
    Ok(field)
}

fn parse_default(pair: Pair<'_, Rule>) -> ParseResult<DefaultValue> {
    let span = Span::from(pair.as_span());
    let value = next(&mut pair.into_inner(), &span)?;
    let text = value.as_str();
    match value.as_rule() {
        Rule::number => parse_number(text, span),
        _ => Ok(match text {
            "true" => DefaultValue::Bool(true),
            "false" => DefaultValue::Bool(false),
            "null" => DefaultValue::Null,
            _ => DefaultValue::Ident(text.to_string()),
        }),
    }
}

fn parse_number(text: &str, span: Span) -> ParseResult<DefaultValue> {
    let invalid = || {
        ParseError::new(
            ParseErrorKind::InvalidNumber {
                text: text.to_string(),
            },
            span.clone(),
        )
    };
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let integer = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(i128::from_str_radix(hex, 16).map_err(|_| invalid())?)
    } else if digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(digits.parse::<i128>().map_err(|_| invalid())?)
    } else {
        None
    };

    match integer {
        Some(v) => Ok(DefaultValue::Int(if negative { -v } else { v })),
        None => {
            let v = match digits {
                "inf" | "infinity" => f64::INFINITY,
                "nan" => f64::NAN,
                _ => digits.parse::<f64>().map_err(|_| invalid())?,
            };
            Ok(DefaultValue::Float(if negative { -v } else { v }))
        }
    }
}

fn parse_enum(pair: Pair<'_, Rule>) -> ParseResult<EnumDef> {
    let span = Span::from(pair.as_span());
    let mut inner = pair.into_inner();
    let name = next(&mut inner, &span)?.as_str();
    let base_pair = next(&mut inner, &span)?;
    let base = ScalarKind::from_schema_name(base_pair.as_str()).ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::Other {
                message: format!("`{}` is not a scalar type", base_pair.as_str()),
            },
            Span::from(base_pair.as_span()),
        )
    })?;

    let mut def = EnumDef::new(name, base);
    let mut seen: HashSet<String> = HashSet::new();
    for member in inner.filter(|p| p.as_rule() == Rule::enum_member) {
        let span = Span::from(member.as_span());
        let mut parts = member.into_inner();
        let member_name = next(&mut parts, &span)?.as_str();
        claim(&mut seen, member_name, span.clone())?;
        def = match parts.next() {
            Some(value) => {
                let value = integer(value.as_str(), Span::from(value.as_span()))?;
                def.member_with_value(member_name, value)
            }
            None => def.member(member_name),
        };
    }
    Ok(def)
}

fn parse_union(pair: Pair<'_, Rule>) -> ParseResult<UnionDef> {
    let span = Span::from(pair.as_span());
    let mut inner = pair.into_inner();
    let name = next(&mut inner, &span)?.as_str();

    let mut def = UnionDef::new(name);
    for member in inner.filter(|p| p.as_rule() == Rule::union_member) {
        let span = Span::from(member.as_span());
        let mut parts = member.into_inner();
        let table = local_name(next(&mut parts, &span)?.as_str());
        def = match parts.next() {
            Some(tag) => {
                let tag_span = Span::from(tag.as_span());
                let value = integer(tag.as_str(), tag_span.clone())?;
                let tag = u32::try_from(value).map_err(|_| {
                    ParseError::new(
                        ParseErrorKind::InvalidNumber {
                            text: value.to_string(),
                        },
                        tag_span,
                    )
                })?;
                def.member_with_tag(table, tag)
            }
            None => def.member(table),
        };
    }
    Ok(def)
}

fn integer(text: &str, span: Span) -> ParseResult<i64> {
    match parse_number(text, span.clone())? {
        DefaultValue::Int(v) => i64::try_from(v).map_err(|_| {
            ParseError::new(
                ParseErrorKind::InvalidNumber {
                    text: text.to_string(),
                },
                span,
            )
        }),
        _ => Err(ParseError::new(
            ParseErrorKind::InvalidNumber {
                text: text.to_string(),
            },
            span,
        )),
    }
}

fn attribute_list(pair: Pair<'_, Rule>) -> Vec<String> {
    pair.into_inner().map(|p| p.as_str().to_string()).collect()
}

fn string_value(pairs: &mut Pairs<'_, Rule>, span: &Span) -> ParseResult<String> {
    let lit = next(pairs, span)?;
    let lit_span = Span::from(lit.as_span());
    Ok(next(&mut lit.into_inner(), &lit_span)?.as_str().to_string())
}

/// `a.b.Name` resolves as `Name`.
fn local_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn next<'i>(pairs: &mut Pairs<'i, Rule>, span: &Span) -> ParseResult<Pair<'i, Rule>> {
    pairs.next().ok_or_else(|| missing_pair(span.clone()))
}

fn missing_pair(span: Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::Other {
            message: "missing expected pair in rule".to_string(),
        },
        span,
    )
}

fn duplicate(name: &str, span: Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::DuplicateDefinition {
            name: name.to_string(),
        },
        span,
    )
}

fn claim(seen: &mut HashSet<String>, name: &str, span: Span) -> ParseResult<()> {
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(duplicate(name, span))
    }
}
