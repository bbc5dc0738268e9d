use std::fmt;

/// 簡單的文字表格，欄位依首次出現順序排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// 以 (欄位, 值) 加入一列；未知欄位會加到最後
    pub fn push_row<I, K, V>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut row = vec![String::new(); self.headers.len()];
        for (key, value) in cells {
            let index = match self.headers.iter().position(|h| h == key.as_ref()) {
                Some(index) => index,
                None => {
                    self.headers.push(key.as_ref().to_string());
                    for existing in &mut self.rows {
                        existing.push(String::new());
                    }
                    row.push(String::new());
                    self.headers.len() - 1
                }
            };
            row[index] = value.into();
        }
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 依欄位名稱取值
    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let column = self.headers.iter().position(|h| h == header)?;
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or_default()
            })
            .collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+");
        let separator = format!("+{}+", separator);

        writeln!(f, "{}", separator)?;
        write_row(f, &self.headers, &widths)?;
        writeln!(f, "{}", separator)?;
        for row in &self.rows {
            write_row(f, row, &widths)?;
        }
        write!(f, "{}", separator)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    write!(f, "|")?;
    for (cell, width) in cells.iter().zip(widths) {
        write!(f, " {:<width$} |", cell, width = width)?;
    }
    writeln!(f)
}

/// 保留左邊 `max` 個字元，超出以 `…` 結尾
pub fn truncate_right(value: &str, max: usize) -> String {
    if value.chars().count() <= max || max == 0 {
        return value.to_string();
    }
    let kept: String = value.chars().take(max - 1).collect();
    format!("{}…", kept)
}

/// 保留右邊 `max` 個字元，超出以 `…` 開頭
pub fn truncate_left(value: &str, max: usize) -> String {
    let count = value.chars().count();
    if count <= max || max == 0 {
        return value.to_string();
    }
    let kept: String = value.chars().skip(count - (max - 1)).collect();
    format!("…{}", kept)
}
