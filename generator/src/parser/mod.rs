//! Workbook loading with encoding and delimiter auto-detection.
//!
//! Two input shapes are supported:
//!
//! - a directory of `<SHEET>.csv` files, one per table
//! - a JSON workbook `{ "<SHEET>": [ {column: value, ...}, ... ], ... }`
//!
//! CSV cells are kept as strings; JSON cells keep their scalar types.

use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::logs::{log_debug, log_info};
use crate::table::{Row, Table, Workbook};

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes with the given encoding; unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    text.trim_start_matches('\u{feff}').to_string()
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into a table. Blank lines are skipped and short rows are
/// padded with empty cells.
pub fn parse_table(name: &str, content: &str, delimiter: char) -> LoadResult<Table> {
    let csv_error = |message: String| LoadError::Csv {
        path: name.to_string(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(LoadError::NoHeaders(name.to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(e.to_string()))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut row = Row::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let cell = record.get(i).unwrap_or("");
            row.insert(header.clone(), Value::String(cell.to_string()));
        }
        rows.push(row);
    }

    let headers = headers.into_iter().filter(|h| !h.is_empty()).collect();
    Ok(Table::new(name, headers, rows))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_table_bytes(name: &str, bytes: &[u8]) -> LoadResult<Table> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    log_debug(format!(
        "{}: encoding {}, delimiter {:?}",
        name, encoding, delimiter
    ));
    parse_table(name, &content, delimiter)
}

/// Load every `*.csv` file of a directory; the file stem is the sheet name.
pub fn load_csv_dir<P: AsRef<Path>>(dir: P) -> LoadResult<Workbook> {
    let dir = dir.as_ref();
    let io_error = |path: &Path, source| LoadError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();

    let mut workbook = Workbook::new();
    for path in files {
        let name = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.trim().to_string(),
            None => continue,
        };
        let bytes = std::fs::read(&path).map_err(|e| io_error(&path, e))?;
        let table = parse_table_bytes(&name, &bytes)?;
        log_info(format!("Loaded sheet {} ({} rows)", name, table.len()));
        workbook.insert(table);
    }
    Ok(workbook)
}

/// Load a JSON workbook: an object mapping sheet names to arrays of row objects.
pub fn load_json_workbook<P: AsRef<Path>>(path: P) -> LoadResult<Workbook> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;
    parse_json_workbook(&display, &content)
}

/// Parse JSON workbook text.
pub fn parse_json_workbook(source_name: &str, content: &str) -> LoadResult<Workbook> {
    let json_error = |message: String| LoadError::Json {
        path: source_name.to_string(),
        message,
    };

    let sheets: Map<String, Value> =
        serde_json::from_str(content).map_err(|e| json_error(e.to_string()))?;

    let mut workbook = Workbook::new();
    for (name, value) in sheets {
        let records = match value {
            Value::Array(records) => records,
            _ => return Err(json_error(format!("sheet '{}' must be an array of rows", name))),
        };
        if let Some(pos) = records.iter().position(|r| !r.is_object()) {
            return Err(json_error(format!(
                "sheet '{}' row {} is not an object",
                name,
                pos + 1
            )));
        }
        let table = Table::from_records(name.trim(), records);
        log_info(format!("Loaded sheet {} ({} rows)", table.name(), table.len()));
        workbook.insert(table);
    }
    Ok(workbook)
}

/// Load a workbook from a CSV directory or a `.json` file.
pub fn load_workbook<P: AsRef<Path>>(path: P) -> LoadResult<Workbook> {
    let path = path.as_ref();
    if path.is_dir() {
        return load_csv_dir(path);
    }
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        load_json_workbook(path)
    } else {
        Err(LoadError::UnsupportedInput(path.display().to_string()))
    }
}
