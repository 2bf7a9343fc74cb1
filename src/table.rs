use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn read_path(path: &Path) -> Result<Self> {
        Self::read_path_renamed(path, &[])
    }

    pub fn read_path_renamed(path: &Path, renames: &[(&str, &str)]) -> Result<Self> {
        let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
        Self::from_reader_renamed(file, renames)
            .with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_renamed(reader, &[])
    }

    /// `renames` match the raw header text exactly (case-sensitive) and are
    /// applied simultaneously, before headers are lowercased.
    pub fn from_reader_renamed<R: Read>(reader: R, renames: &[(&str, &str)]) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .context("read csv header")?
            .iter()
            .map(|raw| {
                let raw = raw.trim().trim_start_matches('\u{feff}');
                renames
                    .iter()
                    .find(|(from, _)| *from == raw)
                    .map(|(_, to)| normalize_header(to))
                    .unwrap_or_else(|| normalize_header(raw))
            })
            .collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            // A broken line only loses itself.
            match record {
                Ok(r) => rows.push(r),
                Err(err) => tracing::debug!("dropping unreadable csv line: {err}"),
            }
        }
        Ok(Self::from_parts(headers, rows))
    }

    pub fn from_parts(headers: Vec<String>, rows: Vec<StringRecord>) -> Self {
        let mut index = HashMap::with_capacity(headers.len());
        for (i, h) in headers.iter().enumerate() {
            index.entry(h.clone()).or_insert(i);
        }
        Self {
            headers,
            index,
            rows,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |record| RowView {
            table: self,
            record,
        })
    }

    pub fn append(&mut self, other: &RawTable) {
        let mut headers = self.headers.clone();
        for h in &other.headers {
            if !self.index.contains_key(h) && !headers.contains(h) {
                headers.push(h.clone());
            }
        }
        let width = headers.len();
        let mut rows: Vec<StringRecord> = self
            .rows
            .iter()
            .map(|r| pad_record(r, width))
            .collect();
        let positions: Vec<usize> = other
            .headers
            .iter()
            .map(|h| headers.iter().position(|x| x == h).unwrap_or(0))
            .collect();
        for r in &other.rows {
            let mut cells = vec![String::new(); width];
            for (src, dst) in positions.iter().enumerate() {
                if let Some(v) = r.get(src) {
                    cells[*dst] = v.to_string();
                }
            }
            rows.push(StringRecord::from(cells));
        }
        *self = Self::from_parts(headers, rows);
    }

    pub fn write_path(&self, path: &Path) -> Result<()> {
        let mut wtr = WriterBuilder::new().flexible(true).from_writer(Vec::new());
        wtr.write_record(&self.headers)?;
        for r in &self.rows {
            wtr.write_record(r)?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| anyhow!("flush csv buffer: {}", e.error()))?;
        write_atomic(path, &bytes)
    }
}

#[derive(Clone, Copy)]
pub struct RowView<'a> {
    table: &'a RawTable,
    record: &'a StringRecord,
}

impl<'a> RowView<'a> {
    pub fn text(&self, column: &str) -> Option<&'a str> {
        let idx = *self.table.index.get(column)?;
        self.record
            .get(idx)
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
    }

    pub fn text_any(&self, columns: &[&str]) -> Option<&'a str> {
        columns.iter().find_map(|c| self.text(c))
    }

    pub fn number(&self, column: &str) -> f64 {
        self.text(column).and_then(parse_number).unwrap_or(0.0)
    }

    pub fn number_any(&self, columns: &[&str]) -> f64 {
        columns
            .iter()
            .find_map(|c| self.text(c).and_then(parse_number))
            .unwrap_or(0.0)
    }

    pub fn maybe_number(&self, column: &str) -> Option<f64> {
        self.text(column).and_then(parse_number)
    }
}

pub fn normalize_header(raw: &str) -> String {
    raw.trim().trim_start_matches('\u{feff}').to_lowercase()
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim().replace(',', "");
    if s.is_empty() || s == "-" {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn pad_record(record: &StringRecord, width: usize) -> StringRecord {
    let mut cells: Vec<&str> = record.iter().collect();
    cells.resize(width, "");
    StringRecord::from(cells)
}

pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for row in rdr.deserialize::<T>() {
        match row {
            Ok(r) => out.push(r),
            Err(err) => tracing::debug!("dropping malformed row in {}: {err}", path.display()),
        }
    }
    Ok(out)
}

pub fn write_records<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    for r in rows {
        wtr.serialize(r)
            .with_context(|| format!("serialize row for {}", path.display()))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow!("flush csv buffer: {}", e.error()))?;
    write_atomic(path, &bytes)
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Match_ID , Team,G\nm1,UBC,2\nm2,TWU,n/a\n";

    #[test]
    fn headers_are_trimmed_and_lowercased() {
        let t = RawTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(t.headers(), &["match_id", "team", "g"]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn numbers_coerce_to_zero() {
        let t = RawTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let goals: Vec<f64> = t.rows().map(|r| r.number("g")).collect();
        assert_eq!(goals, vec![2.0, 0.0]);
        assert!(t.rows().all(|r| r.text("missing").is_none()));
    }

    #[test]
    fn rename_is_case_sensitive_and_simultaneous() {
        let t = RawTable::from_reader_renamed(
            "player,PLAYER,SH\nAnn,3,2\n".as_bytes(),
            &[("PLAYER", "SH"), ("SH", "SOG")],
        )
        .unwrap();
        let row = t.rows().next().unwrap();
        assert_eq!(row.text("player"), Some("Ann"));
        assert_eq!(row.text("sh"), Some("3"));
        assert_eq!(row.text("sog"), Some("2"));
    }

    #[test]
    fn append_aligns_by_name() {
        let mut a = RawTable::from_reader("x,y\n1,2\n".as_bytes()).unwrap();
        let b = RawTable::from_reader("y,z\n3,4\n".as_bytes()).unwrap();
        a.append(&b);
        assert_eq!(a.headers(), &["x", "y", "z"]);
        let rows: Vec<_> = a.rows().collect();
        assert_eq!(rows[1].text("x"), None);
        assert_eq!(rows[1].text("y"), Some("3"));
        assert_eq!(rows[1].text("z"), Some("4"));
    }
}
