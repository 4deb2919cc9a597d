//! Human and JSON renderings of command results

use serde::Serialize;
use shmring_cache::{Record, RegionStats};
use std::io::Write;

/// Record as shown by `--json`: the payload stays a byte array under `data`
/// and gains a hex copy for reading
#[derive(Serialize)]
struct RecordView<'a> {
    #[serde(flatten)]
    record: &'a Record,
    hex: String,
}

pub fn write_records(out: &mut impl Write, records: &[Record], json: bool) -> eyre::Result<()> {
    if json {
        let views: Vec<_> = records
            .iter()
            .map(|record| RecordView {
                record,
                hex: hex::encode(&record.payload),
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &views)?;
        writeln!(out)?;
        return Ok(());
    }

    for record in records {
        writeln!(
            out,
            "id={} key={} len={} payload={}",
            record.proto_id,
            record.key,
            record.payload.len(),
            hex::encode(&record.payload)
        )?;
    }
    Ok(())
}

pub fn write_stats(out: &mut impl Write, stats: &RegionStats, json: bool) -> eyre::Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, stats)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "path:           {}", stats.path.display())?;
    writeln!(out, "block capacity: {} bytes", stats.block_capacity)?;
    writeln!(out, "file size:      {} bytes", stats.file_len)?;
    writeln!(out, "sync:           {}", stats.sync)?;
    writeln!(out, "generation:     {}", stats.generation)?;
    for (index, block) in stats.blocks.iter().enumerate() {
        let marker = if index == stats.active_block { "*" } else { " " };
        writeln!(
            out,
            "{marker} block {index}: read={} write={} used={} free={}",
            block.read_index, block.write_index, block.used, block.free
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_record_lines() {
        let mut out = Vec::new();
        let records = vec![Record::new(7, "k", vec![0xDE, 0xAD])];
        write_records(&mut out, &records, false).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id=7 key=k len=2 payload=dead\n"
        );
    }

    #[test]
    fn test_json_records_keep_wire_field_names() {
        let mut out = Vec::new();
        let records = vec![Record::new(7, "k", vec![1])];
        write_records(&mut out, &records, true).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["id"], 7);
        assert_eq!(value[0]["ukey"], "k");
        assert_eq!(value[0]["data"], serde_json::json!([1]));
        assert_eq!(value[0]["hex"], "01");
    }
}
