// Block indexer
//
// Folds one block into every history bucket inside a single write
// transaction:
//   1. transactions  ← (txn, block seq)
//   2. inputs        ← spend metadata on the consumed output,
//                      owner → address_in / address_txns
//   3. outputs       ← new unspent output,
//                      recipient → address_in / address_txns
//   4. parsed height ← block seq
//
// A failure at any step drops the transaction, so a block is either fully
// indexed or not at all. Replaying an indexed block changes nothing.

use super::{HistoryDb, Spend, TxRecord, UxRecord};
use crate::db::Tx;
use crate::error::{Error, Result};
use crate::primitives::Block;

/// Canonical blocks, by height. Implemented by the chain layer.
pub trait BlockSource {
    /// Height of the newest block; `None` for an empty chain
    fn head_seq(&self) -> Option<u64>;

    fn block_by_seq(&self, seq: u64) -> Option<Block>;
}

impl BlockSource for [Block] {
    fn head_seq(&self) -> Option<u64> {
        self.last().map(Block::seq)
    }

    fn block_by_seq(&self, seq: u64) -> Option<Block> {
        let idx = usize::try_from(seq).ok()?;
        self.get(idx).filter(|b| b.seq() == seq).cloned()
    }
}

impl BlockSource for Vec<Block> {
    fn head_seq(&self) -> Option<u64> {
        self.as_slice().head_seq()
    }

    fn block_by_seq(&self, seq: u64) -> Option<Block> {
        self.as_slice().block_by_seq(seq)
    }
}

// progress line interval during catch-up
const PROGRESS_INTERVAL: u64 = 1000;

impl HistoryDb {
    /// Index `block` in its own write transaction
    pub fn process_block(&self, block: &Block) -> Result<()> {
        self.store().update(|tx| self.parse_block(tx, block))?;
        tracing::debug!(
            "[history] indexed block {} ({} txns)",
            block.seq(),
            block.body.len()
        );
        Ok(())
    }

    /// Index `block` inside the caller's write transaction
    pub fn parse_block(&self, tx: &Tx<'_>, block: &Block) -> Result<()> {
        let seq = block.seq();

        for txn in &block.body {
            let txid = txn.hash();
            self.transactions.add(
                tx,
                &TxRecord {
                    txn: txn.clone(),
                    block_seq: seq,
                },
            )?;

            for input in &txn.inputs {
                let mut ux = self.uxouts.get_required(tx, input)?;
                ux.mark_spent(Spend {
                    txid,
                    block_seq: seq,
                })?;
                self.uxouts.set(tx, &ux)?;

                let owner = ux.out.body.address;
                self.address_ux.add(tx, &owner, input)?;
                self.address_txns.add(tx, &owner, &txid)?;
            }

            for out in block.created_outputs(txn) {
                let hash = out.hash();
                // a replayed block must not clear spend metadata written later
                if self.uxouts.get(tx, &hash)?.is_none() {
                    self.uxouts.set(tx, &UxRecord::unspent(out))?;
                }
                let recipient = out.body.address;
                self.address_ux.add(tx, &recipient, &hash)?;
                self.address_txns.add(tx, &recipient, &txid)?;
            }
        }

        self.history_meta.set_parsed_height(tx, seq)
    }

    /// Index every block from the one after `parsed_height` (genesis when
    /// unset) up to the source head. Each block commits on its own, so an
    /// interrupted catch-up resumes where it stopped. Returns the number of
    /// blocks indexed.
    pub fn catch_up<S: BlockSource + ?Sized>(&self, source: &S) -> Result<u64> {
        let Some(head) = source.head_seq() else {
            return Ok(0);
        };
        let start = match self.parsed_height()? {
            Some(h) => h + 1,
            None => 0,
        };
        if start > head {
            return Ok(0);
        }

        tracing::info!("[history] catching up blocks {}..={}", start, head);
        let mut indexed = 0u64;
        for seq in start..=head {
            let block = source
                .block_by_seq(seq)
                .ok_or(Error::BlockNotFound { seq })?;
            self.process_block(&block)?;
            indexed += 1;
            if indexed % PROGRESS_INTERVAL == 0 {
                tracing::info!("[history] indexed {}/{}", seq, head);
            }
        }
        tracing::info!("[history] caught up to block {} ({} new)", head, indexed);
        Ok(indexed)
    }

    /// Erase the history and index the whole source again
    pub fn rebuild<S: BlockSource + ?Sized>(&self, source: &S) -> Result<u64> {
        self.erase()?;
        self.catch_up(source)
    }
}
