//! Structured output expected from the model.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Summary of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSchema {
    pub name: String,
    pub path: String,
    pub summary: String,
    pub usage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_code_blocks: Option<Vec<CodeBlock>>,
}

/// A notable code region referenced from a file summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    pub name: String,
    pub description: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// Summary of one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSchema {
    pub name: String,
    pub usage: String,
    pub path: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileReference>>,
}

/// A file mentioned in a folder summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    pub file_name: String,
    pub file_path: String,
}

/// A response shape the model is asked to produce.
pub trait StructuredOutput: DeserializeOwned {
    /// JSON schema embedded in the prompt.
    fn json_schema() -> serde_json::Value;

    fn summary(&self) -> &str;
}

impl StructuredOutput for FileSchema {
    fn json_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Name of the file."},
                "path": {"type": "string", "description": "Path to the file within the repository."},
                "summary": {
                    "type": "string",
                    "description": "Summary of the file, its main purpose and its role in the project. \
                        Link important code blocks with Markdown links of the form \
                        `[{description}]({file url}#L{startLine}-L{endLine})`. At most 2-3 paragraphs."
                },
                "usage": {
                    "type": "string",
                    "description": "What the file is used for, in less than 10 words (e.g. Data Parsing, API Requests)."
                },
                "relevantCodeBlocks": {
                    "type": "array",
                    "description": "Important functions, classes or sections of the file with line numbers.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string", "description": "Identifier of the code block."},
                            "description": {"type": "string", "description": "Significance of the code block within the file."},
                            "startLine": {"type": "integer", "description": "Starting line number."},
                            "endLine": {"type": "integer", "description": "Ending line number."}
                        },
                        "required": ["name", "description", "startLine", "endLine"]
                    }
                }
            },
            "required": ["name", "path", "summary", "usage"]
        })
    }

    fn summary(&self) -> &str {
        &self.summary
    }
}

impl StructuredOutput for FolderSchema {
    fn json_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Name of the folder."},
                "usage": {
                    "type": "string",
                    "description": "Purpose of the folder (e.g. Server Lifecycle Management). Limit to 10 words."
                },
                "path": {"type": "string", "description": "Path to the folder."},
                "summary": {
                    "type": "string",
                    "description": "Summary of the folder, its main purpose and its role in the project. \
                        Link important code with Markdown links of the form \
                        `[{description}]({file url}#L{startLine}-L{endLine})`."
                },
                "files": {
                    "type": "array",
                    "description": "Files mentioned in the summary.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "fileName": {"type": "string"},
                            "filePath": {"type": "string"}
                        },
                        "required": ["fileName", "filePath"]
                    }
                }
            },
            "required": ["name", "usage", "path", "summary"]
        })
    }

    fn summary(&self) -> &str {
        &self.summary
    }
}

/// Prompt section telling the model how to format its answer.
pub fn format_instructions<T: StructuredOutput>() -> String {
    let schema = serde_json::to_string_pretty(&T::json_schema()).unwrap_or_default();
    format!(
        "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\
         Respond with the JSON object only.\n\n```json\n{}\n```",
        schema
    )
}

/// The outermost `{ ... }` span of a response, which strips Markdown fences
/// and any prose around the object.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

/// Parse and validate a model response.
pub fn parse_response<T: StructuredOutput>(response: &str) -> Result<T, String> {
    let object = extract_json_object(response).ok_or_else(|| "no JSON object in response".to_string())?;
    let parsed: T = serde_json::from_str(object).map_err(|e| e.to_string())?;

    if parsed.summary().trim().is_empty() {
        return Err("summary is empty".to_string());
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_file_response() {
        let response = r#"Here you go:
```json
{
  "name": "parser.ts",
  "path": "src/utils/parser.ts",
  "summary": "Parses input. See [`parseInput`](#L15-L30).",
  "usage": "Data Parsing",
  "relevantCodeBlocks": [
    {"name": "parseInput", "description": "Entry point", "startLine": 15, "endLine": 30}
  ]
}
```"#;

        let parsed: FileSchema = parse_response(response).unwrap();
        assert_eq!(parsed.name, "parser.ts");
        let blocks = parsed.relevant_code_blocks.unwrap();
        assert_eq!(blocks[0].start_line, 15);
        assert_eq!(blocks[0].end_line, 30);
    }

    #[test]
    fn test_parse_folder_without_optional_files() {
        let response = r#"{"name":"lib","usage":"Helpers","path":"lib","summary":"Shared helpers."}"#;
        let parsed: FolderSchema = parse_response(response).unwrap();
        assert_eq!(parsed.path, "lib");
        assert!(parsed.files.is_none());
    }

    #[test]
    fn test_schema_violations() {
        assert!(parse_response::<FileSchema>("no json here").is_err());

        // Missing usage
        let missing = r#"{"name":"a","path":"a","summary":"s"}"#;
        assert!(parse_response::<FileSchema>(missing).is_err());

        // Wrong type
        let wrong = r#"{"name":"a","path":"a","summary":"s","usage":3}"#;
        assert!(parse_response::<FileSchema>(wrong).is_err());

        // Empty summary
        let empty = r#"{"name":"a","usage":"u","path":"a","summary":"  "}"#;
        assert!(parse_response::<FolderSchema>(empty).is_err());
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("x {\"a\": {}} y"), Some("{\"a\": {}}"));
        assert_eq!(extract_json_object("} {"), None);
        assert_eq!(extract_json_object("plain"), None);
    }

    #[test]
    fn test_format_instructions_embed_schema() {
        let instructions = format_instructions::<FolderSchema>();
        assert!(instructions.contains("\"required\""));
        assert!(instructions.contains("fileName"));
    }
}
