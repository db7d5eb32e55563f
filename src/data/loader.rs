use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use ndarray::Array2;

use super::panel::PricePanel;

/// Load a price panel from a CSV file shaped `date,ASSET1,ASSET2,...`.
///
/// Dates must be ISO (`%Y-%m-%d`). Blank lines are skipped; any other malformed
/// row aborts the load.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<PricePanel> {
  let path = path.as_ref();
  let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
  let mut lines = BufReader::new(file).lines();

  let header = match lines.next() {
    Some(line) => line?,
    None => bail!("{} is empty", path.display()),
  };
  let mut cols = header.split(',');
  match cols.next() {
    Some(first) if first.trim().eq_ignore_ascii_case("date") => {}
    _ => bail!("{} must start with a 'date' column", path.display()),
  }
  let assets: Vec<String> = cols.map(|c| c.trim().to_string()).collect();
  if assets.is_empty() {
    bail!("{} declares no asset columns", path.display());
  }

  let mut dates = Vec::new();
  let mut rows: Vec<f64> = Vec::new();

  for (lineno, line) in lines.enumerate() {
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }

    let mut fields = line.split(',');
    let date_str = fields.next().unwrap_or_default().trim();
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
      .with_context(|| format!("{}:{}: bad date '{}'", path.display(), lineno + 2, date_str))?;
    dates.push(date);

    let mut count = 0;
    for field in fields {
      let value: f64 = field
        .trim()
        .parse()
        .with_context(|| format!("{}:{}: bad value '{}'", path.display(), lineno + 2, field))?;
      rows.push(value);
      count += 1;
    }
    if count != assets.len() {
      bail!(
        "{}:{}: expected {} values, got {}",
        path.display(),
        lineno + 2,
        assets.len(),
        count
      );
    }
  }

  let values = Array2::from_shape_vec((dates.len(), assets.len()), rows)
    .with_context(|| format!("{}: inconsistent row lengths", path.display()))?;

  PricePanel::new(dates, assets, values)
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::load_csv;

  #[test]
  fn loads_well_formed_csv() {
    let mut path = std::env::temp_dir();
    path.push("riskcast_loader_ok.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "date,AAA,BBB").unwrap();
    writeln!(f, "2024-01-02,100.0,50.0").unwrap();
    writeln!(f, "2024-01-03,101.5,49.5").unwrap();
    drop(f);

    let panel = load_csv(&path).unwrap();
    assert_eq!(panel.assets(), &["AAA".to_string(), "BBB".to_string()]);
    assert_eq!(panel.len(), 2);
    std::fs::remove_file(&path).ok();
  }

  #[test]
  fn rejects_ragged_rows() {
    let mut path = std::env::temp_dir();
    path.push("riskcast_loader_ragged.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "date,AAA,BBB").unwrap();
    writeln!(f, "2024-01-02,100.0").unwrap();
    drop(f);

    assert!(load_csv(&path).is_err());
    std::fs::remove_file(&path).ok();
  }
}
