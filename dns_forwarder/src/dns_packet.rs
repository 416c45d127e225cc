use crate::{
    constants,
    dns_header::{DNSHeader, Flags},
    dns_question::DNSQuestion,
    dns_record::DNSRecord,
    error::{DnsError, Result},
};

/// A DNS message as handled by the forwarder: header, questions and answers.
///
/// Authority and additional sections are never populated. Their counts are
/// kept as read from the wire but written out as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DNSPacket {
    header: DNSHeader,
    questions: Vec<DNSQuestion>,
    answers: Vec<DNSRecord>,
}

impl DNSPacket {
    pub fn new(header: DNSHeader) -> Self {
        let mut packet = Self {
            header,
            ..Default::default()
        };
        packet.sync_counts();
        packet
    }

    /// A single-question query carrying the given id and flags.
    pub fn query(id: u16, flags: Flags, question: DNSQuestion) -> Self {
        let mut packet = Self {
            header: DNSHeader::new(id, flags),
            questions: vec![question],
            answers: Vec::new(),
        };
        packet.sync_counts();
        packet
    }

    pub fn header(&self) -> &DNSHeader {
        &self.header
    }
    pub fn header_mut(&mut self) -> &mut DNSHeader {
        &mut self.header
    }
    pub fn id(&self) -> u16 {
        self.header.id()
    }
    pub fn flags(&self) -> &Flags {
        self.header.flags()
    }
    pub fn questions(&self) -> &[DNSQuestion] {
        &self.questions
    }
    pub fn answers(&self) -> &[DNSRecord] {
        &self.answers
    }

    pub fn into_answers(self) -> Vec<DNSRecord> {
        self.answers
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        DNSPacket::try_from(data)
    }

    pub fn push_question(&mut self, question: DNSQuestion) -> Result<()> {
        check_count("qdcount", self.questions.len())?;
        self.questions.push(question);
        self.sync_counts();
        Ok(())
    }

    pub fn push_answer(&mut self, answer: DNSRecord) -> Result<()> {
        check_count("ancount", self.answers.len())?;
        self.answers.push(answer);
        self.sync_counts();
        Ok(())
    }

    /// Appends an answer owned by `questions[index]`, copying its name, type
    /// and class.
    pub fn add_answer(&mut self, index: usize, ttl: u32, data: Vec<u8>) -> Result<()> {
        let question = self.questions.get(index).ok_or(DnsError::QuestionIndex {
            index,
            len: self.questions.len(),
        })?;
        let answer = DNSRecord::new(
            question.name().clone(),
            question.type_(),
            question.class(),
            ttl,
            data,
        )?;
        self.push_answer(answer)
    }

    pub fn toggle_response_flag(&mut self) {
        let flags = self.header.flags_mut();
        flags.set_qr(!flags.qr());
    }

    /// Drops any answers and marks the message with `rcode`.
    pub fn fail_with(&mut self, rcode: u8) -> Result<()> {
        self.header.flags_mut().set_rcode(rcode)?;
        self.answers.clear();
        self.sync_counts();
        Ok(())
    }

    /// The query for `questions[index]` alone, reusing this message's id and flags.
    pub fn single_question(&self, index: usize) -> Result<DNSPacket> {
        let question = self.questions.get(index).ok_or(DnsError::QuestionIndex {
            index,
            len: self.questions.len(),
        })?;
        Ok(DNSPacket::query(self.id(), *self.flags(), question.clone()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut header = self.header.clone();
        header.set_counts(self.questions.len() as u16, self.answers.len() as u16);

        let mut bytes = header.to_bytes();
        for question in &self.questions {
            question.encode(&mut bytes);
        }
        for answer in &self.answers {
            answer.encode(&mut bytes);
        }
        bytes
    }

    fn sync_counts(&mut self) {
        self.header
            .set_counts(self.questions.len() as u16, self.answers.len() as u16);
    }
}

/// Section counts are 16 bits on the wire.
fn check_count(field: &'static str, len: usize) -> Result<()> {
    if len >= u16::MAX as usize {
        return Err(DnsError::InvalidField {
            field,
            value: len + 1,
            max: u16::MAX as usize,
        });
    }
    Ok(())
}

impl TryFrom<&[u8]> for DNSPacket {
    type Error = DnsError;

    fn try_from(packet: &[u8]) -> Result<Self> {
        let header = DNSHeader::try_from(packet)?;
        let mut current_pos = constants::DNS_HEADER_SIZE;

        // Counts come off the wire; size the sections by what the buffer can hold.
        let fits = packet.len().saturating_sub(current_pos) / (1 + constants::DNS_QUESTION_SIZE);
        let mut questions = Vec::with_capacity((header.qdcount() as usize).min(fits));
        for _ in 0..header.qdcount() {
            let (question, next) = DNSQuestion::parse(packet, current_pos)?;
            current_pos = next;
            questions.push(question);
        }

        let fits = packet.len().saturating_sub(current_pos) / (1 + constants::DNS_RECORD_SIZE);
        let mut answers = Vec::with_capacity((header.ancount() as usize).min(fits));
        for _ in 0..header.ancount() {
            let (record, next) = DNSRecord::parse(packet, current_pos)?;
            current_pos = next;
            answers.push(record);
        }

        Ok(DNSPacket {
            header,
            questions,
            answers,
        })
    }
}
