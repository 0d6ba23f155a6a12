use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::provider::{DataSource, ProviderError, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

const DEFAULT_BLOCK_SIZE: i64 = 100 * 1024 * 1024;
const UNLIMITED: i64 = -1;
const ALLOCATION_PAUSE: Duration = Duration::from_millis(100);

pub struct OomKillDataSource;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct OomKillModel {
    memory: i64,
    block_size: Option<i64>,
}

/// How many blocks to allocate and how large the last one is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AllocationPlan {
    block_size: usize,
    /// `None` allocates until the process dies or the read is cancelled.
    num_blocks: Option<u64>,
    last_block_size: usize,
}

impl AllocationPlan {
    fn new(memory: i64, block_size: Option<i64>) -> Result<Self, ProviderError> {
        if memory <= 0 && memory != UNLIMITED {
            return Err(ProviderError::diagnostic(
                "Invalid Memory Size",
                "Memory size must be greater than zero or -1 (infinite).",
            ));
        }

        let block_size = match block_size {
            Some(n) if n < 0 => {
                return Err(ProviderError::diagnostic(
                    "Invalid Block Size",
                    "Block size must be greater than zero.",
                ));
            }
            None | Some(0) => DEFAULT_BLOCK_SIZE,
            Some(n) => n,
        };

        if memory == UNLIMITED {
            return Ok(Self {
                block_size: block_size as usize,
                num_blocks: None,
                last_block_size: block_size as usize,
            });
        }

        let mut num_blocks = memory / block_size;
        let mut last_block_size = block_size;
        let remainder = memory % block_size;
        if remainder > 0 {
            num_blocks += 1;
            last_block_size = remainder;
        }

        Ok(Self {
            block_size: block_size as usize,
            num_blocks: Some(num_blocks as u64),
            last_block_size: last_block_size as usize,
        })
    }

    fn size_of(&self, index: u64) -> usize {
        match self.num_blocks {
            Some(n) if index + 1 == n => self.last_block_size,
            _ => self.block_size,
        }
    }

    fn is_done(&self, index: u64) -> bool {
        self.num_blocks.is_some_and(|n| index >= n)
    }
}

#[async_trait]
impl DataSource for OomKillDataSource {
    fn type_name(&self) -> &'static str {
        "oom_kill"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Utilize a predetermined amount of memory during the plan phase. \
             Useful for testing OOM (Out Of Memory) scenarios.",
            vec![
                Attribute::required(
                    "memory",
                    AttributeType::Int64,
                    "Amount of memory to allocate in bytes, or -1 to allocate until killed.",
                ),
                Attribute::optional(
                    "block_size",
                    AttributeType::Int64,
                    "Size of each memory block. Defaults to 100 MiB.",
                ),
            ],
        )
    }

    async fn read(&self, ctx: &Context, config: Value) -> Result<Response, ProviderError> {
        let data: OomKillModel = decode(config)?;
        let plan = AllocationPlan::new(data.memory, data.block_size)?;

        match plan.num_blocks {
            None => tracing::info!(
                block_size = plan.block_size,
                "starting infinite memory allocation"
            ),
            Some(_) => tracing::info!(
                total_bytes = data.memory,
                block_size = plan.block_size,
                "starting limited memory allocation"
            ),
        }

        let blocks = allocate(ctx, &plan).await?;
        let total: usize = blocks.iter().map(Vec::len).sum();

        tracing::info!(
            total_bytes = total,
            allocated_blocks = blocks.len(),
            block_size = plan.block_size,
            "memory allocation complete"
        );
        drop(std::hint::black_box(blocks));

        Response::from_model(&data)
    }
}

async fn allocate(ctx: &Context, plan: &AllocationPlan) -> Result<Vec<Vec<u8>>, ProviderError> {
    let mut blocks = Vec::new();
    let mut total = 0usize;
    let mut index = 0u64;

    while !plan.is_done(index) {
        let size = plan.size_of(index);
        let block = fill_block(size);
        total += block.len();
        blocks.push(block);

        tracing::debug!(
            block_index = index,
            block_size = size,
            total_bytes = total,
            "allocated memory block"
        );

        ctx.sleep(ALLOCATION_PAUSE).await?;
        index += 1;
    }

    Ok(blocks)
}

// Touch every byte so the pages are actually committed.
fn fill_block(size: usize) -> Vec<u8> {
    (0..size).map(|j| (j % 256) as u8).collect()
}
