//! Integration tests for importing the legacy text export

mod common;

use std::io::{BufRead, Cursor, Read};
use std::path::Path;

use common::{assert_float_eq, assert_series_eq, fixture_path};
use recon_plot::{CancelToken, DatasetEvent, SignalDataset, TextImporter};

fn import_fixture() -> SignalDataset {
    TextImporter::new()
        .import_file(fixture_path("test_data.txt"))
        .expect("fixture should import")
}

#[test]
fn test_fixture_header() {
    let dataset = import_fixture();

    assert_eq!(dataset.title(), "Ud");
    assert_eq!(dataset.device(), "N403");
    assert_eq!(dataset.original_file_name(), "490.WINREC");
    assert_eq!(dataset.label_x(), "Time, s");
    assert_eq!(dataset.label_y(), "Vol\"tage, V");
    assert!(!dataset.is_modified());
    assert!(dataset.is_rename_needed());
}

#[test]
fn test_fixture_channels() {
    let dataset = import_fixture();

    // The discrete K1 descriptor and its follower are skipped
    let names: Vec<_> = dataset.channels().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["Ud (UZ1)", "Id (TA1)", "Uf", "If"]);

    let ud = dataset.channel(0).unwrap();
    assert_eq!(ud.unit(), "V");
    assert!(!ud.is_selected());
    assert_eq!(ud.factor(), 1.0);
    assert_eq!(ud.scale(), 1.0);
    assert_eq!(ud.smoothing_window(), 100);
    assert_eq!(ud.data_count(), 10);
    assert_eq!(ud.data()[0], -2.314);
    assert_eq!(ud.min_value(), -2.314);
    assert_eq!(ud.max_value(), 2.314);

    let id = dataset.channel(1).unwrap();
    assert_eq!(id.unit(), "A");
    assert!(id.is_selected());
    assert_eq!(id.factor(), 0.5);
    assert_eq!(id.smoothing_window(), 1);

    let uf = dataset.channel(2).unwrap();
    assert!(!uf.is_selected());
    assert_eq!(uf.factor(), 2.0);

    // The units row and some sample rows end with an empty column
    let if_ = dataset.channel(3).unwrap();
    assert_eq!(if_.unit(), "A");
    assert_eq!(if_.data_count(), 10);
    assert_eq!(if_.factor(), 1.0);
    assert_eq!(if_.smoothing_window(), 1);

    assert_eq!(dataset.selected_channels(), vec![1]);
}

#[test]
fn test_fixture_time_base_and_window() {
    let dataset = import_fixture();

    assert_eq!(dataset.sample_count(), 10);
    assert_eq!(dataset.time_at(0), 0.0);
    assert_float_eq(dataset.time_at(9), 0.009, 1e-12);
    assert!(dataset.time_at(10).is_nan());

    let extents = dataset.extents();
    assert_eq!(extents.min_y, -2.314);
    assert_eq!(extents.max_y, 14.5);

    // Header bounds are replaced by the nice-rounded extents
    let window = dataset.window();
    assert_eq!(window.left, 0.0);
    assert_eq!(window.bottom, -2.4);
    assert_eq!(window.top, 15.0);
}

#[test]
fn test_fixture_smoothed_series() {
    let dataset = import_fixture();

    // factor 0.5, no smoothing
    let id = dataset.smoothed(1).unwrap();
    assert_series_eq(
        &id,
        &[5.0, 5.25, 5.5, 5.75, 6.0, 6.25, 6.5, 6.75, 7.0, 7.25],
        1e-12,
    );

    // window 100 on 10 samples is a running mean
    let ud = dataset.smoothed(0).unwrap();
    assert_float_eq(ud[0], -2.314, 1e-12);
    assert_float_eq(ud[1], (-2.314 - 1.0) / 2.0, 1e-12);
    assert_float_eq(ud[4], 0.0, 1e-12);

    let points = dataset.plot_points(2).unwrap();
    assert_eq!(points.len(), 10);
    assert_float_eq(points[0][1], 3.0, 1e-12);
}

#[test]
fn test_import_into_keeps_target_when_cancelled() {
    let token = CancelToken::new();
    let mut importer = TextImporter::new().with_cancel_token(token.clone());

    let mut target = SignalDataset::new();
    target.set_title("existing");
    let events = target.subscribe();

    token.cancel();
    let err = importer
        .import_into(fixture_path("test_data.txt"), &mut target)
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(target.title(), "existing");
    assert_eq!(target.channel_count(), 0);

    // The token stays cancelled until reset
    assert!(token.is_cancelled());
    token.reset();
    importer
        .import_into(fixture_path("test_data.txt"), &mut target)
        .unwrap();
    assert_eq!(target.title(), "Ud");
    assert_eq!(target.channel_count(), 4);
    assert!(events.try_iter().any(|e| e == DatasetEvent::DataLoaded));
}

/// Reader that trips a cancel token once `threshold` bytes were consumed
struct CancellingReader {
    inner: Cursor<Vec<u8>>,
    consumed: usize,
    threshold: usize,
    token: CancelToken,
}

impl Read for CancellingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consume_bytes(n);
        Ok(n)
    }
}

impl BufRead for CancellingReader {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.consume_bytes(amt);
    }
}

impl CancellingReader {
    fn consume_bytes(&mut self, amount: usize) {
        self.consumed += amount;
        if self.consumed >= self.threshold {
            self.token.cancel();
        }
    }
}

#[test]
fn test_cancel_during_data_rows() {
    let text = std::fs::read(fixture_path("test_data.txt")).unwrap();
    let units_row = String::from_utf8_lossy(&text)
        .find(", s, V")
        .expect("fixture has a units row");

    let token = CancelToken::new();
    let mut importer = TextImporter::new().with_cancel_token(token.clone());
    let events = importer.subscribe();

    let reader = CancellingReader {
        inner: Cursor::new(text.clone()),
        consumed: 0,
        threshold: units_row + 1,
        token: token.clone(),
    };
    let err = importer
        .import_reader(reader, text.len() as u64, Path::new("test_data.txt"))
        .unwrap_err();

    assert!(err.is_cancelled());
    let events: Vec<_> = events.try_iter().collect();
    assert!(events.contains(&DatasetEvent::Cancelled));
    assert!(!events.contains(&DatasetEvent::DataLoaded));
}

#[test]
fn test_import_save_open_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("record.plot");

    let mut imported = import_fixture();
    imported.save_as(&path).unwrap();
    assert!(!imported.is_rename_needed());
    assert_eq!(imported.path(), Some(path.as_path()));

    let reopened = SignalDataset::open(&path).unwrap();
    assert_eq!(reopened, imported);
    assert!(!reopened.is_modified());
    assert_eq!(&*reopened.smoothed(0).unwrap(), &*imported.smoothed(0).unwrap());
}

#[test]
fn test_missing_file_is_io_error() {
    let err = TextImporter::new()
        .import_file(fixture_path("does_not_exist.txt"))
        .unwrap_err();
    assert!(err.to_string().contains("does_not_exist.txt"));
    assert!(!err.is_cancelled());
}
