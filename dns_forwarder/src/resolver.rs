use std::{panic, thread};

use tracing::debug;

use crate::{
    constants,
    dns_header::{OPCODE_QUERY, RCODE_NOT_IMPLEMENTED},
    dns_packet::DNSPacket,
    dns_record::DNSRecord,
    error::Result,
    upstream::Upstream,
};

/// Answers every question of a query, either locally with a placeholder
/// record or by forwarding each question on its own to an upstream.
///
/// Answers are appended in question order whatever the mode.
pub struct ForwardingResolver {
    upstream: Option<Box<dyn Upstream>>,
    max_in_flight: usize,
}

impl ForwardingResolver {
    pub fn placeholder() -> Self {
        Self {
            upstream: None,
            max_in_flight: 1,
        }
    }

    /// `max_in_flight` bounds how many questions of one query are forwarded
    /// at the same time; 1 forwards them strictly one after another.
    pub fn forwarding(upstream: impl Upstream + 'static, max_in_flight: usize) -> Self {
        Self {
            upstream: Some(Box::new(upstream)),
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn is_forwarding(&self) -> bool {
        self.upstream.is_some()
    }

    pub fn resolve(&self, query: &mut DNSPacket) -> Result<()> {
        if query.flags().opcode() != OPCODE_QUERY {
            debug!(id = query.id(), opcode = query.flags().opcode(), "Unsupported opcode");
            return query.fail_with(RCODE_NOT_IMPLEMENTED);
        }

        let Some(upstream) = self.upstream.as_deref() else {
            for index in 0..query.questions().len() {
                query.add_answer(
                    index,
                    constants::PLACEHOLDER_TTL,
                    constants::PLACEHOLDER_DATA.to_vec(),
                )?;
            }
            return Ok(());
        };

        // Collect everything first so a failure leaves the query untouched.
        let answers = self.forward_all(upstream, query)?;
        for (index, answer) in answers.into_iter().enumerate() {
            match answer {
                Some(answer) => {
                    query.add_answer(index, answer.ttl(), answer.data().to_vec())?
                }
                None => debug!(id = query.id(), index, "Upstream returned no answer"),
            }
        }
        Ok(())
    }

    fn forward_all(
        &self,
        upstream: &dyn Upstream,
        query: &DNSPacket,
    ) -> Result<Vec<Option<DNSRecord>>> {
        let total = query.questions().len();
        if self.max_in_flight == 1 || total <= 1 {
            return (0..total)
                .map(|index| forward_one(upstream, query, index))
                .collect();
        }

        let mut answers = Vec::with_capacity(total);
        for start in (0..total).step_by(self.max_in_flight) {
            let end = (start + self.max_in_flight).min(total);
            let batch: Vec<Result<Option<DNSRecord>>> = thread::scope(|s| {
                let handles: Vec<_> = (start..end)
                    .map(|index| s.spawn(move || forward_one(upstream, query, index)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap_or_else(|e| panic::resume_unwind(e)))
                    .collect()
            });
            for answer in batch {
                answers.push(answer?);
            }
        }
        Ok(answers)
    }
}

fn forward_one(
    upstream: &dyn Upstream,
    query: &DNSPacket,
    index: usize,
) -> Result<Option<DNSRecord>> {
    let single = query.single_question(index)?;
    debug!(
        id = single.id(),
        index,
        name = %single.questions()[0].name(),
        record_type = %single.questions()[0].record_type(),
        "Forwarding question"
    );
    let reply = upstream.exchange(&single)?;
    Ok(reply.into_answers().into_iter().next())
}
