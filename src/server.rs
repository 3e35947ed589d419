//! MCP Server implementation using rmcp

use crate::error::Error;
use crate::pdf::{extract_pages, load_pdf_bytes, read_document_info, PageSelection, TableGrid};
use crate::sandbox::{list_pdfs, ListOptions, PdfFileEntry, Sandbox};
use anyhow::Result;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, service::RequestContext, tool, tool_handler, tool_router, RoleServer,
    ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory all operations are confined to
    pub root_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
        }
    }
}

/// Sandboxed PDF reader MCP server
#[derive(Clone)]
pub struct PdfServer {
    sandbox: Arc<Sandbox>,
    tool_router: ToolRouter<Self>,
}

/// Structured failure embedded in a tool response
#[derive(Debug, Serialize, JsonSchema)]
pub struct ToolError {
    /// Machine-readable failure kind (e.g. "path_violation", "not_found")
    pub kind: String,
    /// Human-readable description
    pub message: String,
}

impl ToolError {
    fn from_error(e: &Error) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.client_message(),
        }
    }
}

// ============================================================================
// Request/Response types for read_pdf_text
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadPdfTextParams {
    /// Path to the PDF file, relative to the configured root directory
    pub file_path: String,
    /// 1-indexed page numbers to extract, returned in the order given
    /// (default: all pages in document order)
    #[serde(default)]
    pub page_numbers: Option<Vec<u32>>,
    /// Also detect ruled tables on the selected pages (default: false)
    #[serde(default)]
    pub extract_tables: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page: u32,
    pub text: String,
    /// Tables detected on this page; present only when requested.
    /// Each table is rows of cells, null marking grid positions with no cell.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableGrid>>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ReadPdfTextResult {
    /// The path that was requested
    pub file_path: String,
    /// Total pages in the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    pub pages: Vec<PageContent>,
    /// Text of the selected pages joined with blank lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

// ============================================================================
// Request/Response types for get_pdf_info
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PdfInfoParams {
    /// Path to the PDF file, relative to the configured root directory
    pub file_path: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PdfInfoResult {
    /// The path that was requested
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// File size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

// ============================================================================
// Request/Response types for list_pdfs_in_directory
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPdfsParams {
    /// Directory to scan, relative to the configured root directory
    /// (default: the root itself)
    #[serde(default)]
    pub directory_path: Option<String>,
    /// Descend into subdirectories (default: false)
    #[serde(default)]
    pub recursive: bool,
    /// Filename glob pattern to filter by (e.g. "report*")
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ListPdfsResult {
    /// The directory that was scanned, as requested
    pub directory: String,
    /// PDF files found, paths relative to the scanned directory
    pub files: Vec<PdfFileEntry>,
    /// Total number of files found
    pub total_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

#[tool_router]
impl PdfServer {
    /// Create a server rooted at the given directory.
    /// Fails if the directory does not exist or is not a directory.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> crate::error::Result<Self> {
        Self::with_config(ServerConfig {
            root_dir: root_dir.as_ref().to_path_buf(),
        })
    }

    /// Create a server with full configuration
    pub fn with_config(config: ServerConfig) -> crate::error::Result<Self> {
        let sandbox = Sandbox::new(&config.root_dir)?;
        Ok(Self {
            sandbox: Arc::new(sandbox),
            tool_router: Self::tool_router(),
        })
    }

    /// The canonicalized directory this server is confined to
    pub fn root(&self) -> &Path {
        self.sandbox.root()
    }

    #[tool(
        description = "Read text content from a PDF file inside the configured root directory. \
Optionally select specific pages (1-indexed; returned in the order requested) and detect ruled \
tables on those pages. Any out-of-range page number fails the whole call. Paths are resolved \
relative to the root directory; paths escaping it are rejected."
    )]
    async fn read_pdf_text(&self, Parameters(params): Parameters<ReadPdfTextParams>) -> String {
        let result = self
            .process_read_pdf_text(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "read_pdf_text failed");
                ReadPdfTextResult {
                    file_path: params.file_path.clone(),
                    total_pages: None,
                    pages: vec![],
                    full_text: None,
                    error: Some(ToolError::from_error(&e)),
                }
            });

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    #[tool(
        description = "Read metadata from a PDF file inside the configured root directory: page \
count, file size, and the document information fields (title, author, subject, creator, \
producer, creation and modification dates). Missing fields are omitted from the response."
    )]
    async fn get_pdf_info(&self, Parameters(params): Parameters<PdfInfoParams>) -> String {
        let result = self.process_get_pdf_info(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "get_pdf_info failed");
            PdfInfoResult {
                file_path: params.file_path.clone(),
                page_count: None,
                file_size: None,
                title: None,
                author: None,
                subject: None,
                creator: None,
                producer: None,
                creation_date: None,
                modification_date: None,
                error: Some(ToolError::from_error(&e)),
            }
        });

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    #[tool(
        description = "List PDF files (case-insensitive .pdf extension) in a directory inside \
the configured root. Defaults to the root itself and does not recurse unless asked. Returned \
paths are relative to the scanned directory. Supports glob pattern filtering on file names."
    )]
    async fn list_pdfs_in_directory(
        &self,
        Parameters(params): Parameters<ListPdfsParams>,
    ) -> String {
        let result = self.process_list_pdfs(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "list_pdfs_in_directory failed");
            ListPdfsResult {
                directory: params.directory_path.clone().unwrap_or_else(|| ".".to_string()),
                files: vec![],
                total_count: 0,
                error: Some(ToolError::from_error(&e)),
            }
        });

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }
}

impl PdfServer {
    /// Resolve, load, and extract a document. Public so tests can exercise
    /// the tool logic without an MCP transport.
    pub async fn process_read_pdf_text(
        &self,
        params: &ReadPdfTextParams,
    ) -> crate::error::Result<ReadPdfTextResult> {
        let path = self.sandbox.resolve_file(&params.file_path)?;
        let data = load_pdf_bytes(&path)?;

        let selection = match &params.page_numbers {
            Some(pages) => PageSelection::Pages(pages.clone()),
            None => PageSelection::All,
        };
        let extract_tables = params.extract_tables;

        // Parsing is CPU-bound; keep it off the async threads
        let (total_pages, extracted) =
            tokio::task::spawn_blocking(move || extract_pages(&data, &selection, extract_tables))
                .await
                .map_err(|e| Error::Pdfium {
                    reason: format!("Task join error: {}", e),
                })??;

        tracing::debug!(
            file = %params.file_path,
            pages = extracted.len(),
            "extracted page text"
        );

        let full_text = extracted
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let pages = extracted
            .into_iter()
            .map(|p| PageContent {
                page: p.page,
                text: p.text,
                tables: p.tables,
            })
            .collect();

        Ok(ReadPdfTextResult {
            file_path: params.file_path.clone(),
            total_pages: Some(total_pages),
            pages,
            full_text: Some(full_text),
            error: None,
        })
    }

    /// Resolve a document and read its metadata
    pub async fn process_get_pdf_info(
        &self,
        params: &PdfInfoParams,
    ) -> crate::error::Result<PdfInfoResult> {
        let path = self.sandbox.resolve_file(&params.file_path)?;
        let file_size = std::fs::metadata(&path)?.len();
        let data = load_pdf_bytes(&path)?;

        let info = tokio::task::spawn_blocking(move || read_document_info(&data))
            .await
            .map_err(|e| Error::Pdfium {
                reason: format!("Task join error: {}", e),
            })??;

        Ok(PdfInfoResult {
            file_path: params.file_path.clone(),
            page_count: Some(info.page_count),
            file_size: Some(file_size),
            title: info.metadata.title,
            author: info.metadata.author,
            subject: info.metadata.subject,
            creator: info.metadata.creator,
            producer: info.metadata.producer,
            creation_date: info.metadata.creation_date,
            modification_date: info.metadata.modification_date,
            error: None,
        })
    }

    /// Resolve a directory and list the PDF files in it
    pub fn process_list_pdfs(
        &self,
        params: &ListPdfsParams,
    ) -> crate::error::Result<ListPdfsResult> {
        let requested = params.directory_path.as_deref().unwrap_or(".");
        let dir = self.sandbox.resolve_dir(requested)?;

        let options = ListOptions {
            recursive: params.recursive,
            pattern: params
                .pattern
                .as_ref()
                .and_then(|p| glob::Pattern::new(p).ok()),
        };

        let files = list_pdfs(&self.sandbox, &dir, &options)?;
        let total_count = files.len() as u32;

        Ok(ListPdfsResult {
            directory: requested.to_string(),
            files,
            total_count,
            error: None,
        })
    }
}

#[tool_handler]
impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF reader MCP server: extracts text, tables, and metadata from PDF files \
                 inside a configured root directory, and lists the PDFs available there. \
                 All paths are interpreted relative to that root; the PDFs under it are \
                 also exposed as resources."
                    .into(),
            ),
        }
    }

    /// List every PDF under the sandbox root as a resource
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let params = ListPdfsParams {
            directory_path: None,
            recursive: true,
            pattern: None,
        };

        let listing = self.process_list_pdfs(&params).map_err(|e| {
            tracing::warn!(error = %e, "list_resources failed");
            ErrorData::internal_error(e.client_message(), None)
        })?;

        let resources = listing
            .files
            .into_iter()
            .map(|file| {
                let uri = format!("pdf:///{}", file.path);
                let mut resource = RawResource::new(uri, file.name.clone());
                resource.mime_type = Some("application/pdf".to_string());
                resource.description = Some(format!(
                    "PDF file ({} bytes){}",
                    file.size,
                    file.modified
                        .as_ref()
                        .map(|m| format!(", modified: {}", m))
                        .unwrap_or_default()
                ));
                resource.size = Some(file.size as u32);

                Annotated {
                    raw: resource,
                    annotations: None,
                }
            })
            .collect();

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: Default::default(),
        })
    }

    /// Read a PDF resource and return its extracted text
    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let uri = &request.uri;

        let relative = match uri.strip_prefix("pdf:///") {
            Some(rel) => rel,
            None => {
                return Err(ErrorData::invalid_params(
                    "Only pdf:/// URIs are supported",
                    None,
                ))
            }
        };

        let params = ReadPdfTextParams {
            file_path: relative.to_string(),
            page_numbers: None,
            extract_tables: false,
        };

        match self.process_read_pdf_text(&params).await {
            Ok(result) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::TextResourceContents {
                    uri: uri.clone(),
                    mime_type: Some("text/plain".to_string()),
                    text: result.full_text.unwrap_or_default(),
                    meta: Default::default(),
                }],
            }),
            Err(e) => {
                tracing::warn!(error = %e, "read_resource failed");
                Err(ErrorData::internal_error(e.client_message(), None))
            }
        }
    }
}

/// Run the MCP server over stdio, rooted at the given directory
pub async fn run_server<P: AsRef<Path>>(root_dir: P) -> Result<()> {
    run_server_with_config(ServerConfig {
        root_dir: root_dir.as_ref().to_path_buf(),
    })
    .await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    let server = PdfServer::with_config(config)?;

    tracing::info!(
        root = %server.sandbox.root().display(),
        "PDF reader MCP server ready, waiting for connections..."
    );

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
