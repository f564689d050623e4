//! MCP tool catalogue
//!
//! Every tool validates its arguments, maps them onto exactly one application
//! command, and reports the outcome as text.

use crate::colors::translate_fields;
use crate::executor::CommandExecutor;
use crate::format::tool_result;
use crate::mcp::{RequestId, Response};
use design_mcp_core::{DesignError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Whether a command only reads the document or changes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Read,
    Mutation,
}

/// Tool definition for MCP tools/list
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// A catalogue entry
pub struct Tool {
    pub name: &'static str,
    pub command: &'static str,
    pub kind: CommandKind,
    pub description: &'static str,
    pub input_schema: Value,
    /// Validate tool arguments and build the command parameters
    pub prepare: fn(Value) -> Result<Value>,
}

static CATALOGUE: LazyLock<Vec<Tool>> = LazyLock::new(catalogue);

/// Look up a tool by name
pub fn find_tool(name: &str) -> Option<&'static Tool> {
    CATALOGUE.iter().find(|tool| tool.name == name)
}

/// Get list of available tools
pub fn list_tools() -> Vec<ToolDef> {
    CATALOGUE
        .iter()
        .map(|tool| ToolDef {
            name: tool.name.into(),
            description: tool.description.into(),
            input_schema: tool.input_schema.clone(),
        })
        .collect()
}

/// Handle a tools/call request
///
/// Unknown tools and invalid arguments are JSON-RPC errors. Anything that
/// goes wrong after the command is handed to the executor is reported as
/// an `isError` tool result.
pub async fn handle_tool_call<E: CommandExecutor>(
    name: &str,
    arguments: Value,
    id: RequestId,
    executor: &E,
) -> Response {
    let Some(tool) = find_tool(name) else {
        return Response::from_error(id, &DesignError::UnknownTool(name.to_string()));
    };

    let params = match (tool.prepare)(arguments) {
        Ok(params) => params,
        Err(e) => return Response::from_error(id, &e),
    };

    debug!("Tool {} -> {}", tool.name, tool.command);
    let outcome = executor.execute(tool.command, params).await;
    if let Err(e) = &outcome {
        warn!("Tool {} failed: {}", tool.name, e);
    }

    Response::success(id, tool_result(tool.command, tool.kind, outcome))
}

// === Argument helpers ===

fn parse<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| DesignError::InvalidParams(e.to_string()))
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DesignError::InvalidParams(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

fn require_positive(field: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(DesignError::InvalidParams(format!(
            "{} must be a positive number, got {}",
            field, value
        )));
    }
    Ok(())
}

/// Serialize parameters, translating color names in `color_fields`
fn with_colors<T: Serialize>(params: &T, color_fields: &[&str]) -> Result<Value> {
    let mut value = serde_json::to_value(params)?;
    if let Some(map) = value.as_object_mut() {
        translate_fields(map, color_fields)?;
    }
    Ok(value)
}

// === Parameter types ===

/// Shape kinds the application can create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeType {
    Rectangle,
    Ellipse,
    Text,
    Line,
    Polygon,
}

/// Parameters for create_shape
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShapeParams {
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Parameters for tools addressing a single shape
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeRef {
    pub shape_id: String,
}

/// Parameters for update_shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShapeParams {
    pub shape_id: String,
    pub properties: Map<String, Value>,
}

/// Parameters for move_shape
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveShapeParams {
    pub shape_id: String,
    pub left: f64,
    pub top: f64,
    #[serde(default)]
    pub relative: bool,
}

/// Parameters for list_shapes
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListShapesParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
}

/// Parameters for create_frame
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFrameParams {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

/// Parameters for add_to_frame
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToFrameParams {
    pub frame_id: String,
    pub shape_ids: Vec<String>,
}

/// Parameters for tools addressing a single page
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRef {
    pub page_id: String,
}

/// Parameters for add_page
#[derive(Debug, Serialize, Deserialize)]
pub struct AddPageParams {
    pub name: String,
}

/// Parameters for rename_page
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamePageParams {
    pub page_id: String,
    pub name: String,
}

/// Parameters for search_icons
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchIconsParams {
    pub query: String,
    #[serde(default = "default_icon_limit")]
    pub limit: u32,
}

fn default_icon_limit() -> u32 {
    10
}

/// Parameters for insert_icon
#[derive(Debug, Serialize, Deserialize)]
pub struct InsertIconParams {
    pub icon: String,
    pub left: f64,
    pub top: f64,
    #[serde(default = "default_icon_size")]
    pub size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn default_icon_size() -> f64 {
    24.0
}

// === Argument preparation ===

fn prepare_create_shape(args: Value) -> Result<Value> {
    let p: CreateShapeParams = parse(args)?;
    require_positive("width", p.width)?;
    require_positive("height", p.height)?;
    if p.shape_type == ShapeType::Text && p.text.as_deref().is_none_or(|t| t.is_empty()) {
        return Err(DesignError::InvalidParams(
            "Text shapes need a non-empty 'text'".into(),
        ));
    }
    if let Some(width) = p.stroke_width {
        require_positive("strokeWidth", width)?;
    }
    with_colors(&p, &["fill", "stroke"])
}

fn prepare_shape_ref(args: Value) -> Result<Value> {
    let p: ShapeRef = parse(args)?;
    require_text("shapeId", &p.shape_id)?;
    Ok(serde_json::to_value(p)?)
}

fn prepare_update_shape(args: Value) -> Result<Value> {
    let mut p: UpdateShapeParams = parse(args)?;
    require_text("shapeId", &p.shape_id)?;
    if p.properties.is_empty() {
        return Err(DesignError::InvalidParams(
            "properties must contain at least one field".into(),
        ));
    }
    if p.properties.contains_key("id") {
        return Err(DesignError::InvalidParams(
            "a shape's id cannot be changed".into(),
        ));
    }
    translate_fields(&mut p.properties, &["fill", "stroke", "color"])?;
    Ok(json!({ "shapeId": p.shape_id, "properties": p.properties }))
}

fn prepare_move_shape(args: Value) -> Result<Value> {
    let p: MoveShapeParams = parse(args)?;
    require_text("shapeId", &p.shape_id)?;
    if !(p.left.is_finite() && p.top.is_finite()) {
        return Err(DesignError::InvalidParams(
            "left and top must be finite numbers".into(),
        ));
    }
    Ok(serde_json::to_value(p)?)
}

fn prepare_list_shapes(args: Value) -> Result<Value> {
    let p: ListShapesParams = parse(args)?;
    Ok(serde_json::to_value(p)?)
}

fn prepare_create_frame(args: Value) -> Result<Value> {
    let p: CreateFrameParams = parse(args)?;
    require_positive("width", p.width)?;
    require_positive("height", p.height)?;
    with_colors(&p, &["fill"])
}

fn prepare_add_to_frame(args: Value) -> Result<Value> {
    let p: AddToFrameParams = parse(args)?;
    require_text("frameId", &p.frame_id)?;
    if p.shape_ids.is_empty() {
        return Err(DesignError::InvalidParams(
            "shapeIds must name at least one shape".into(),
        ));
    }
    Ok(serde_json::to_value(p)?)
}

fn prepare_no_args(args: Value) -> Result<Value> {
    let _: Map<String, Value> = parse(args)?;
    Ok(json!({}))
}

fn prepare_add_page(args: Value) -> Result<Value> {
    let p: AddPageParams = parse(args)?;
    require_text("name", &p.name)?;
    Ok(serde_json::to_value(p)?)
}

fn prepare_rename_page(args: Value) -> Result<Value> {
    let p: RenamePageParams = parse(args)?;
    require_text("pageId", &p.page_id)?;
    require_text("name", &p.name)?;
    Ok(serde_json::to_value(p)?)
}

fn prepare_page_ref(args: Value) -> Result<Value> {
    let p: PageRef = parse(args)?;
    require_text("pageId", &p.page_id)?;
    Ok(serde_json::to_value(p)?)
}

fn prepare_search_icons(args: Value) -> Result<Value> {
    let mut p: SearchIconsParams = parse(args)?;
    require_text("query", &p.query)?;
    p.limit = p.limit.clamp(1, 50);
    Ok(serde_json::to_value(p)?)
}

fn prepare_insert_icon(args: Value) -> Result<Value> {
    let p: InsertIconParams = parse(args)?;
    require_text("icon", &p.icon)?;
    require_positive("size", p.size)?;
    with_colors(&p, &["color"])
}

// === Catalogue ===

fn catalogue() -> Vec<Tool> {
    vec![
        Tool {
            name: "create_shape",
            command: "shape:create-shape",
            kind: CommandKind::Mutation,
            description: "Create a shape on the current page. Example: {\"type\": \"Rectangle\", \"left\": 0, \"top\": 0, \"width\": 100, \"height\": 50, \"fill\": \"blue\"}",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": ["Rectangle", "Ellipse", "Text", "Line", "Polygon"],
                        "description": "Kind of shape"
                    },
                    "left": { "type": "number", "description": "X position in pixels" },
                    "top": { "type": "number", "description": "Y position in pixels" },
                    "width": { "type": "number", "description": "Width in pixels" },
                    "height": { "type": "number", "description": "Height in pixels" },
                    "name": { "type": "string", "description": "Layer name" },
                    "fill": { "type": "string", "description": "Fill color, a name like \"red\" or hex like \"#ff0000\"" },
                    "stroke": { "type": "string", "description": "Stroke color, name or hex" },
                    "strokeWidth": { "type": "number", "description": "Stroke width in pixels" },
                    "text": { "type": "string", "description": "Content for Text shapes" },
                    "parentId": { "type": "string", "description": "Frame to create the shape in" }
                },
                "required": ["type", "left", "top", "width", "height"]
            }),
            prepare: prepare_create_shape,
        },
        Tool {
            name: "get_shape",
            command: "shape:get-shape",
            kind: CommandKind::Read,
            description: "Get a shape's properties. Example: {\"shapeId\": \"shp_1\"}",
            input_schema: shape_ref_schema(),
            prepare: prepare_shape_ref,
        },
        Tool {
            name: "update_shape",
            command: "shape:update-shape",
            kind: CommandKind::Mutation,
            description: "Change properties of a shape. Example: {\"shapeId\": \"shp_1\", \"properties\": {\"fill\": \"green\", \"opacity\": 0.5}}",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "shapeId": { "type": "string", "description": "Shape to update" },
                    "properties": {
                        "type": "object",
                        "description": "Properties to set. Color fields accept names or hex."
                    }
                },
                "required": ["shapeId", "properties"]
            }),
            prepare: prepare_update_shape,
        },
        Tool {
            name: "delete_shape",
            command: "shape:delete-shape",
            kind: CommandKind::Mutation,
            description: "Delete a shape. Example: {\"shapeId\": \"shp_1\"}",
            input_schema: shape_ref_schema(),
            prepare: prepare_shape_ref,
        },
        Tool {
            name: "move_shape",
            command: "shape:move-shape",
            kind: CommandKind::Mutation,
            description: "Move a shape to a position, or by an offset when relative is true",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "shapeId": { "type": "string", "description": "Shape to move" },
                    "left": { "type": "number", "description": "New X (or X offset)" },
                    "top": { "type": "number", "description": "New Y (or Y offset)" },
                    "relative": { "type": "boolean", "default": false, "description": "Treat left/top as offsets" }
                },
                "required": ["shapeId", "left", "top"]
            }),
            prepare: prepare_move_shape,
        },
        Tool {
            name: "list_shapes",
            command: "shape:list-shapes",
            kind: CommandKind::Read,
            description: "List shapes on a page (current page if pageId is omitted)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pageId": { "type": "string", "description": "Page to list" }
                }
            }),
            prepare: prepare_list_shapes,
        },
        Tool {
            name: "create_frame",
            command: "frame:create-frame",
            kind: CommandKind::Mutation,
            description: "Create a frame (board) that can contain shapes",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "left": { "type": "number" },
                    "top": { "type": "number" },
                    "width": { "type": "number" },
                    "height": { "type": "number" },
                    "name": { "type": "string", "description": "Frame name" },
                    "fill": { "type": "string", "description": "Background color, name or hex" }
                },
                "required": ["left", "top", "width", "height"]
            }),
            prepare: prepare_create_frame,
        },
        Tool {
            name: "add_to_frame",
            command: "frame:add-children",
            kind: CommandKind::Mutation,
            description: "Move existing shapes into a frame. Example: {\"frameId\": \"frm_1\", \"shapeIds\": [\"shp_1\", \"shp_2\"]}",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "frameId": { "type": "string" },
                    "shapeIds": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["frameId", "shapeIds"]
            }),
            prepare: prepare_add_to_frame,
        },
        Tool {
            name: "list_pages",
            command: "page:list-pages",
            kind: CommandKind::Read,
            description: "List the pages of the document",
            input_schema: empty_schema(),
            prepare: prepare_no_args,
        },
        Tool {
            name: "add_page",
            command: "page:add-page",
            kind: CommandKind::Mutation,
            description: "Add a page. Example: {\"name\": \"Drafts\"}",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Page name" }
                },
                "required": ["name"]
            }),
            prepare: prepare_add_page,
        },
        Tool {
            name: "rename_page",
            command: "page:rename-page",
            kind: CommandKind::Mutation,
            description: "Rename a page",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pageId": { "type": "string" },
                    "name": { "type": "string", "description": "New page name" }
                },
                "required": ["pageId", "name"]
            }),
            prepare: prepare_rename_page,
        },
        Tool {
            name: "delete_page",
            command: "page:delete-page",
            kind: CommandKind::Mutation,
            description: "Delete a page and everything on it",
            input_schema: page_ref_schema(),
            prepare: prepare_page_ref,
        },
        Tool {
            name: "switch_page",
            command: "page:switch-page",
            kind: CommandKind::Mutation,
            description: "Make a page the current page",
            input_schema: page_ref_schema(),
            prepare: prepare_page_ref,
        },
        Tool {
            name: "get_document",
            command: "document:get-document",
            kind: CommandKind::Read,
            description: "Get document metadata: name, pages, current page",
            input_schema: empty_schema(),
            prepare: prepare_no_args,
        },
        Tool {
            name: "search_icons",
            command: "icon:search-icons",
            kind: CommandKind::Read,
            description: "Search the icon library. Example: {\"query\": \"arrow\", \"limit\": 5}",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search terms" },
                    "limit": { "type": "integer", "default": 10, "minimum": 1, "maximum": 50 }
                },
                "required": ["query"]
            }),
            prepare: prepare_search_icons,
        },
        Tool {
            name: "insert_icon",
            command: "icon:insert-icon",
            kind: CommandKind::Mutation,
            description: "Insert an icon from the library. Example: {\"icon\": \"arrow-right\", \"left\": 10, \"top\": 10, \"color\": \"black\"}",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "icon": { "type": "string", "description": "Icon name from search_icons" },
                    "left": { "type": "number" },
                    "top": { "type": "number" },
                    "size": { "type": "number", "default": 24 },
                    "color": { "type": "string", "description": "Icon color, name or hex" }
                },
                "required": ["icon", "left", "top"]
            }),
            prepare: prepare_insert_icon,
        },
    ]
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn shape_ref_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "shapeId": { "type": "string", "description": "Shape id, e.g. \"shp_1\"" }
        },
        "required": ["shapeId"]
    })
}

fn page_ref_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "pageId": { "type": "string", "description": "Page id from list_pages" }
        },
        "required": ["pageId"]
    })
}
