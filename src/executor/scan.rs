//! Sequential scan over every page of the database.

use crate::heap::{Field, HeapError, MAX_SLOTS, Record, SlotId, SlottedPage};
use crate::storage::PageId;
use crate::storage::buffer::{BufferPool, PageReadGuard, Replacer};
use crate::storage::io::Storage;

use super::error::ExecutorError;

/// Leaf operator that walks all pages and slots in order.
///
/// The current page stays fixed in shared mode while its slots are
/// consumed and is released when the scan moves to the next page, so at
/// most one page is pinned at a time.
///
/// With a relation tag set, records whose last field does not render to
/// the tag are skipped, and the tag field is stripped from the output.
/// This last-field convention is the only multi-relation mechanism, a
/// stand-in for a real catalog.
pub struct ScanNode<S: Storage, R: Replacer> {
    pool: BufferPool<S, R>,
    relation: Option<String>,
    next_page: u64,
    next_slot: SlotId,
    guard: Option<PageReadGuard<S, R>>,
    current: Option<Vec<Field>>,
}

impl<S: Storage, R: Replacer> ScanNode<S, R> {
    /// Creates a scan over the pool, optionally filtered to one relation.
    pub fn new(pool: BufferPool<S, R>, relation: Option<String>) -> Self {
        Self {
            pool,
            relation,
            next_page: 0,
            next_slot: 0,
            guard: None,
            current: None,
        }
    }

    pub async fn open(&mut self) -> Result<(), ExecutorError> {
        self.next_page = 0;
        self.next_slot = 0;
        self.guard = None;
        self.current = None;
        Ok(())
    }

    pub async fn next(&mut self) -> Result<bool, ExecutorError> {
        loop {
            if self.guard.is_none() {
                if self.next_page >= self.pool.page_count().await as u64 {
                    self.current = None;
                    return Ok(false);
                }
                self.guard = Some(self.pool.fetch_page(PageId::new(self.next_page)).await?);
                self.next_slot = 0;
            }

            let mut found = None;
            {
                let guard = self.guard.as_ref().expect("scan holds its current page");
                let page = SlottedPage::new(&guard[..]);
                while (self.next_slot as usize) < MAX_SLOTS {
                    let slot_id = self.next_slot;
                    self.next_slot += 1;

                    let Some(bytes) = page.get(slot_id) else {
                        continue;
                    };
                    let text = std::str::from_utf8(bytes).map_err(|_| {
                        HeapError::InvalidRecord(format!(
                            "page {} slot {} is not valid UTF-8",
                            self.next_page, slot_id
                        ))
                    })?;
                    let record = Record::deserialize(text)?;

                    if let Some(tag) = &self.relation {
                        match record.fields.last() {
                            Some(last) if last.to_string() == *tag => {}
                            _ => continue,
                        }
                    }

                    found = Some(record);
                    break;
                }
            }

            match found {
                Some(mut record) => {
                    if self.relation.is_some() {
                        // Drop the relation tag; callers see the payload only.
                        record.fields.pop();
                    }
                    self.current = Some(record.fields);
                    return Ok(true);
                }
                None => {
                    // Page exhausted: release its latch before moving on.
                    self.guard = None;
                    self.next_page += 1;
                }
            }
        }
    }

    pub fn close(&mut self) {
        self.guard = None;
        self.current = None;
        self.next_page = 0;
        self.next_slot = 0;
    }

    pub fn output(&self) -> Option<&[Field]> {
        self.current.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::super::insert::InsertNode;
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::storage::buffer::TwoQReplacer;

    fn pool(capacity: usize) -> BufferPool<MemoryStorage, TwoQReplacer> {
        BufferPool::new(MemoryStorage::new(), TwoQReplacer::new(), capacity)
    }

    async fn load(pool: &BufferPool<MemoryStorage, TwoQReplacer>, records: Vec<Record>) {
        let mut insert = InsertNode::new(pool.clone());
        for record in records {
            insert.set_record(record);
            assert!(insert.next().await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_scan_empty_database() {
        let pool = pool(4);
        let mut scan = ScanNode::new(pool, None);
        scan.open().await.unwrap();
        assert!(!scan.next().await.unwrap());
        assert!(scan.output().is_none());
    }

    #[tokio::test]
    async fn test_scan_returns_inserted_records() {
        let pool = pool(4);
        load(
            &pool,
            vec![
                Record::new(vec![Field::Int32(1), Field::Text("a".into())]),
                Record::new(vec![Field::Int32(2), Field::Text("b".into())]),
            ],
        )
        .await;

        let mut scan = ScanNode::new(pool, None);
        scan.open().await.unwrap();

        assert!(scan.next().await.unwrap());
        assert_eq!(
            scan.output().unwrap(),
            &[Field::Int32(1), Field::Text("a".into())]
        );
        assert!(scan.next().await.unwrap());
        assert_eq!(
            scan.output().unwrap(),
            &[Field::Int32(2), Field::Text("b".into())]
        );
        assert!(!scan.next().await.unwrap());
        // Exhausted stays exhausted.
        assert!(!scan.next().await.unwrap());
        scan.close();
    }

    #[tokio::test]
    async fn test_relation_filter_strips_tag() {
        let pool = pool(4);
        load(
            &pool,
            vec![
                Record::new(vec![Field::Int32(1), Field::Text("orders".into())]),
                Record::new(vec![Field::Int32(2), Field::Text("items".into())]),
                Record::new(vec![Field::Int32(3), Field::Text("orders".into())]),
            ],
        )
        .await;

        let mut scan = ScanNode::new(pool, Some("orders".into()));
        scan.open().await.unwrap();

        assert!(scan.next().await.unwrap());
        assert_eq!(scan.output().unwrap(), &[Field::Int32(1)]);
        assert!(scan.next().await.unwrap());
        assert_eq!(scan.output().unwrap(), &[Field::Int32(3)]);
        assert!(!scan.next().await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_spans_pages() {
        let pool = pool(4);
        // Each record is ~30 bytes; the 1KB record region holds ~30, so
        // 100 records span several pages.
        let records: Vec<_> = (0..100)
            .map(|i| Record::new(vec![Field::Int32(i), Field::Int32(i * i)]))
            .collect();
        load(&pool, records).await;
        assert!(pool.page_count().await > 1);

        let mut scan = ScanNode::new(pool, None);
        scan.open().await.unwrap();
        let mut seen = Vec::new();
        while scan.next().await.unwrap() {
            let row = scan.output().unwrap();
            let Field::Int32(i) = row[0] else {
                panic!("unexpected field kind");
            };
            assert_eq!(row[1], Field::Int32(i * i));
            seen.push(i);
        }
        seen.sort();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_reopen_rewinds() {
        let pool = pool(4);
        load(&pool, vec![Record::new(vec![Field::Int32(7)])]).await;

        let mut scan = ScanNode::new(pool, None);
        scan.open().await.unwrap();
        assert!(scan.next().await.unwrap());
        assert!(!scan.next().await.unwrap());

        scan.close();
        scan.open().await.unwrap();
        assert!(scan.next().await.unwrap());
        assert_eq!(scan.output().unwrap(), &[Field::Int32(7)]);
    }
}
