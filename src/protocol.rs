use byteorder::{NetworkEndian, ReadBytesExt};
use bytes::BufMut;
use enum_primitive_derive::Primitive;
use modular_bitfield::{bitfield, prelude::*};
use num_traits::FromPrimitive;
use std::{
    fmt,
    io::{self, Cursor},
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};
use tracing::trace;

/// Queries always fit in a single unextended UDP datagram.
pub const MAX_QUERY_SIZE: usize = 512;

/// Receive buffer size for replies. Anything longer arrives truncated with
/// TC set and is discarded.
pub const MAX_RESPONSE_SIZE: usize = 1024;

pub type ID = u16;

pub const CLASS_IN: u16 = 1;

// Pointer targets may themselves end in pointers, so expansion is bounded to
// reject malicious loops
const MAX_POINTER_EXPANSIONS: usize = 128;

/// Record type codes used on the wire in QTYPE and TYPE fields.
///
/// Only the variants a user can ask for are named; anything else a server
/// sends back is carried as `Other` with its raw code so it can still be
/// cached and displayed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    MX,
    AAAA,
    Other(u16),
}

impl RecordType {
    pub fn code(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::MX => 15,
            RecordType::AAAA => 28,
            RecordType::Other(code) => code,
        }
    }

    pub fn from_code(code: u16) -> RecordType {
        match code {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            15 => RecordType::MX,
            28 => RecordType::AAAA,
            code => RecordType::Other(code),
        }
    }

    /// Parses the type argument of a `lookup` command. `Other` codes are not
    /// queryable and have no name.
    pub fn from_name(name: &str) -> Option<RecordType> {
        match name.to_ascii_uppercase().as_str() {
            "A" => Some(RecordType::A),
            "NS" => Some(RecordType::NS),
            "CNAME" => Some(RecordType::CNAME),
            "MX" => Some(RecordType::MX),
            "AAAA" => Some(RecordType::AAAA),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.pad("A"),
            RecordType::NS => f.pad("NS"),
            RecordType::CNAME => f.pad("CNAME"),
            RecordType::MX => f.pad("MX"),
            RecordType::AAAA => f.pad("AAAA"),
            RecordType::Other(code) => f.pad(&code.to_string()),
        }
    }
}

// https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
#[derive(Copy, Clone, Debug, Primitive, PartialEq, Eq)]
pub enum OpCode {
    Query = 0,        // a standard query (QUERY)
    InverseQuery = 1, // an inverse query (IQUERY)
    Status = 2,       // a server status request (STATUS)
                      // 3-15 reserved for future use
}

/*
https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4

In order to reduce the size of messages, the domain system utilizes a
compression scheme which eliminates the repetition of domain names in a
message.  In this scheme, an entire domain name or a list of labels at
the end of a domain name is replaced with a pointer to a prior occurance
of the same name.

The pointer takes the form of a two octet sequence:

    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    | 1  1|                OFFSET                   |
    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+

The first two bits are ones.  This allows a pointer to be distinguished
from a label, since the label must begin with two zero bits because
labels are restricted to 63 octets or less.  The OFFSET field specifies
an offset from the start of the message (i.e., the first octet of the
ID field in the domain header).

The compression scheme allows a domain name in a message to be
represented as either:

   - a sequence of labels ending in a zero octet

   - a pointer

   - a sequence of labels ending with a pointer
 */
#[derive(Debug, PartialEq)]
struct CompressedDomain {
    labels: Vec<String>,
    pointer: Option<u16>,
}

impl CompressedDomain {
    /// Reads one name pass. A pointer terminates the pass; the cursor ends
    /// exactly two bytes past the pointer octets.
    fn read_from(cursor: &mut Cursor<&[u8]>) -> io::Result<CompressedDomain> {
        let mut domain = CompressedDomain {
            labels: Vec::new(),
            pointer: None,
        };
        let mut total_len = 0usize;

        loop {
            let octet = cursor.read_u8()?;
            total_len += 1;

            // Upper two bits of the length octet are a type tag
            match octet & 0b1100_0000 {
                0b1100_0000 => {
                    // 14 bit offset pointer to a label somewhere else in the
                    // message, lower six bits of the octet plus the next octet
                    let upper_byte = octet & 0b0011_1111;
                    let lower_byte = cursor.read_u8()?;
                    let offset = (upper_byte as u16) << 8 | lower_byte as u16;

                    domain.pointer = Some(offset);
                    return Ok(domain);
                }
                0b0000_0000 => {
                    let len: usize = octet.into();

                    if len == 0 {
                        return Ok(domain);
                    }

                    total_len += len;

                    // Names are limited to 255 octets (RFC 1035 section 2.3.4)
                    if total_len > 255 {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "domain name longer than 255 octets",
                        ));
                    }

                    let bytes = take_slice(cursor, len)?;
                    // Label bytes are ASCII
                    let label = bytes.iter().map(|&b| char::from(b)).collect();
                    domain.labels.push(label);
                }
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "reserved label type",
                    ))
                }
            }
        }
    }

    fn uncompress(&self, cursor: &Cursor<&[u8]>) -> io::Result<String> {
        self.expand(cursor, 0)
    }

    fn expand(&self, cursor: &Cursor<&[u8]>, expansions: usize) -> io::Result<String> {
        let name = self.labels.join(".");

        let Some(offset) = self.pointer else {
            return Ok(name);
        };

        if expansions >= MAX_POINTER_EXPANSIONS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "compression pointer chain too long",
            ));
        }

        let mut cursor = cursor.clone();
        cursor.set_position(offset.into());

        let target = CompressedDomain::read_from(&mut cursor)?;
        let rest = target.expand(&cursor, expansions + 1)?;

        if name.is_empty() {
            Ok(rest)
        } else if rest.is_empty() {
            Ok(name)
        } else {
            Ok(format!("{name}.{rest}"))
        }
    }
}

/// Reads a possibly-compressed name, leaving the cursor just past the
/// terminator or pointer. The result is dotted form with no trailing dot.
fn read_name(cursor: &mut Cursor<&[u8]>) -> io::Result<String> {
    let domain = CompressedDomain::read_from(cursor)?;
    domain.uncompress(cursor)
}

fn write_name<B: BufMut>(name: &str, buf: &mut B) {
    if !name.is_empty() {
        for label in name.split('.') {
            let bytes = label.as_bytes();

            debug_assert!(bytes.len() <= 63);

            buf.put_u8(bytes.len() as u8);
            buf.put_slice(bytes);
        }
    }

    buf.put_u8(0);
}

fn take_slice<'a>(cursor: &'a mut Cursor<&[u8]>, size: usize) -> io::Result<&'a [u8]> {
    let start = cursor.position() as usize;
    let end = start
        .checked_add(size)
        .filter(|&end| end <= cursor.get_ref().len())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "field runs past end of message",
            )
        })?;
    cursor.set_position(end as u64);
    Ok(&cursor.get_ref()[start..end])
}

/*

    +---------------------+
    |        Header       |
    +---------------------+
    |       Question      | the question for the name server
    +---------------------+
    |        Answer       | RRs answering the question
    +---------------------+
    |      Authority      | RRs pointing toward an authority
    +---------------------+
    |      Additional     | RRs holding additional information
    +---------------------+
*/
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<Record>,
    authority: Vec<Record>,
    additional: Vec<Record>,
}

impl Packet {
    pub fn new() -> Packet {
        Packet {
            header: Header::new(),
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// Builds an iterative query: all header flags zero (in particular RD=0,
    /// the delegation walk is ours to do), one IN-class question.
    pub fn query(id: ID, domain: &str, qtype: RecordType) -> Packet {
        let mut packet = Packet::new();
        packet.set_id(id);
        packet.add_question(Question {
            domain: domain.to_owned(),
            qtype,
            qclass: CLASS_IN,
        });
        packet
    }

    /// Decodes a message in a single forward pass. Trailing bytes beyond the
    /// counted sections are ignored.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Packet> {
        let mut cursor = Cursor::new(bytes);

        let header = Header::read_from(&mut cursor)?;

        let questions = (0..header.question_count)
            .map(|_| Question::read_from(&mut cursor))
            .collect::<io::Result<Vec<Question>>>()?;

        let answers = Packet::read_records(&mut cursor, header.answer_count)?;
        let authority = Packet::read_records(&mut cursor, header.authority_count)?;
        let additional = Packet::read_records(&mut cursor, header.additional_count)?;

        Ok(Packet {
            header,
            questions,
            answers,
            authority,
            additional,
        })
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = vec![];
        self.header.write_to(&mut buf)?;
        for question in &self.questions {
            question.write_to(&mut buf)?;
        }
        for record in &self.answers {
            record.write_to(&mut buf)?;
        }
        for record in &self.authority {
            record.write_to(&mut buf)?;
        }
        for record in &self.additional {
            record.write_to(&mut buf)?;
        }
        Ok(buf)
    }

    pub fn id(&self) -> ID {
        self.header.id
    }

    pub fn set_id(&mut self, id: ID) {
        self.header.id = id;
    }

    pub fn query_response(&self) -> bool {
        self.header.query_response
    }

    pub fn set_query_response(&mut self, value: bool) {
        self.header.query_response = value;
    }

    pub fn authoritative_answer(&self) -> bool {
        self.header.authoritative_answer
    }

    pub fn set_authoritative_answer(&mut self, value: bool) {
        self.header.authoritative_answer = value;
    }

    pub fn truncated_message(&self) -> bool {
        self.header.truncated_message
    }

    pub fn set_truncated_message(&mut self, value: bool) {
        self.header.truncated_message = value;
    }

    pub fn response_code(&self) -> u8 {
        self.header.response_code
    }

    pub fn set_response_code(&mut self, code: u8) {
        self.header.response_code = code;
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn add_question(&mut self, question: Question) {
        self.header.question_count += 1;
        self.questions.push(question);
    }

    pub fn answers(&self) -> &[Record] {
        &self.answers
    }

    pub fn add_answer(&mut self, record: Record) {
        self.header.answer_count += 1;
        self.answers.push(record);
    }

    pub fn authority(&self) -> &[Record] {
        &self.authority
    }

    pub fn add_authority(&mut self, record: Record) {
        self.header.authority_count += 1;
        self.authority.push(record);
    }

    pub fn additional(&self) -> &[Record] {
        &self.additional
    }

    pub fn add_additional(&mut self, record: Record) {
        self.header.additional_count += 1;
        self.additional.push(record);
    }

    fn read_records(cursor: &mut Cursor<&[u8]>, count: u16) -> io::Result<Vec<Record>> {
        (0..count)
            .map(|_| Record::read_from(cursor))
            .collect::<io::Result<Vec<Record>>>()
    }
}

impl Default for Packet {
    fn default() -> Packet {
        Packet::new()
    }
}

/* Header section

                                1  1  1  1  1  1
  0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
|                      ID                       |
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
|QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
|                    QDCOUNT                    |
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
|                    ANCOUNT                    |
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
|                    NSCOUNT                    |
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
|                    ARCOUNT                    |
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
*/
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    id: ID,
    query_response: bool,
    operation_code: OpCode,
    authoritative_answer: bool,
    truncated_message: bool,
    recursion_desired: bool,
    recursion_available: bool,
    z: u8,
    // Kept raw rather than as an enum: servers may send any 4-bit value and
    // every nonzero code gets the same treatment
    response_code: u8,
    question_count: u16,
    answer_count: u16,
    authority_count: u16,
    additional_count: u16,
}

#[bitfield(bits = 16)]
#[repr(u16)]
#[derive(Debug)]
struct HeaderFlags {
    rcode: B4,
    z: B3,
    ra: bool,
    rd: bool,
    tc: bool,
    aa: bool,
    opcode: B4,
    qr: bool,
}

impl Header {
    pub fn new() -> Header {
        Header {
            id: 0,
            query_response: false,
            operation_code: OpCode::Query,
            authoritative_answer: false,
            truncated_message: false,
            recursion_desired: false,
            recursion_available: false,
            z: 0,
            response_code: 0,
            question_count: 0,
            answer_count: 0,
            authority_count: 0,
            additional_count: 0,
        }
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> io::Result<Header> {
        let id = cursor.read_u16::<NetworkEndian>()?;
        let flags = cursor.read_u16::<NetworkEndian>()?;
        let qdcount = cursor.read_u16::<NetworkEndian>()?;
        let ancount = cursor.read_u16::<NetworkEndian>()?;
        let nscount = cursor.read_u16::<NetworkEndian>()?;
        let arcount = cursor.read_u16::<NetworkEndian>()?;

        let flags = HeaderFlags::from(flags);

        trace!(
            id,
            ?flags,
            qdcount,
            ancount,
            nscount,
            arcount,
            "Header::read_from"
        );

        let operation_code = OpCode::from_u8(flags.opcode()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported opcode {}", flags.opcode()),
            )
        })?;

        Ok(Header {
            id,
            query_response: flags.qr(),
            operation_code,
            authoritative_answer: flags.aa(),
            truncated_message: flags.tc(),
            recursion_desired: flags.rd(),
            recursion_available: flags.ra(),
            z: flags.z(),
            response_code: flags.rcode(),
            question_count: qdcount,
            answer_count: ancount,
            authority_count: nscount,
            additional_count: arcount,
        })
    }

    fn write_to<B: BufMut>(&self, buf: &mut B) -> io::Result<()> {
        let flags = HeaderFlags::new()
            .with_qr(self.query_response)
            .with_opcode(self.operation_code as u8)
            .with_aa(self.authoritative_answer)
            .with_tc(self.truncated_message)
            .with_rd(self.recursion_desired)
            .with_ra(self.recursion_available)
            .with_z(self.z)
            .with_rcode(self.response_code);

        buf.put_u16(self.id);
        buf.put_u16(flags.into());
        buf.put_u16(self.question_count);
        buf.put_u16(self.answer_count);
        buf.put_u16(self.authority_count);
        buf.put_u16(self.additional_count);
        Ok(())
    }
}

impl Default for Header {
    fn default() -> Header {
        Header::new()
    }
}

/* Question section

                                1  1  1  1  1  1
  0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
|                                               |
/                     QNAME                     /
/                                               /
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
|                     QTYPE                     |
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
|                     QCLASS                    |
+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
*/
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Question {
    pub domain: String,
    pub qtype: RecordType,
    pub qclass: u16,
}

impl Question {
    fn read_from(cursor: &mut Cursor<&[u8]>) -> io::Result<Question> {
        let domain = read_name(cursor)?;
        let qtype = cursor.read_u16::<NetworkEndian>()?;
        let qclass = cursor.read_u16::<NetworkEndian>()?;

        Ok(Question {
            domain,
            qtype: RecordType::from_code(qtype),
            qclass,
        })
    }

    fn write_to<B: BufMut>(&self, buf: &mut B) -> io::Result<()> {
        write_name(&self.domain, buf);
        buf.put_u16(self.qtype.code());
        buf.put_u16(self.qclass);
        Ok(())
    }
}

/*
The answer, authority, and additional sections all share the same
format: a variable number of resource records, where the number of
records is specified in the corresponding count field in the header.
Each resource record has the following format:
                                    1  1  1  1  1  1
      0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    |                                               |
    /                                               /
    /                      NAME                     /
    |                                               |
    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    |                      TYPE                     |
    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    |                     CLASS                     |
    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    |                      TTL                      |
    |                                               |
    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    |                   RDLENGTH                    |
    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--|
    /                     RDATA                     /
    /                                               /
    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
 */
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    // https://datatracker.ietf.org/doc/html/rfc1035#section-3.4.1
    A {
        name: String,
        ttl: u32,
        address: Ipv4Addr,
    },
    // https://datatracker.ietf.org/doc/html/rfc3596#section-2.2
    AAAA {
        name: String,
        ttl: u32,
        address: Ipv6Addr,
    },
    // https://datatracker.ietf.org/doc/html/rfc1035#section-3.3.11
    NS {
        name: String,
        ttl: u32,
        nameserver: String,
    },
    // https://datatracker.ietf.org/doc/html/rfc1035#section-3.3.1
    CNAME {
        name: String,
        ttl: u32,
        canonical: String,
    },
    // MX rdata is not interpreted; the record only matters as a cache entry
    // for the queried (name, type) pair
    MX {
        name: String,
        ttl: u32,
    },
    // Any type this resolver does not interpret, keeping the raw type code
    // for display
    Other {
        name: String,
        code: u16,
        ttl: u32,
    },
}

impl Record {
    pub fn read_from(cursor: &mut Cursor<&[u8]>) -> io::Result<Record> {
        // Clone of the whole message for resolving compression pointers that
        // occur inside RDATA
        let message = cursor.clone();

        let name = read_name(cursor)?;
        let rtype = cursor.read_u16::<NetworkEndian>()?;
        let _class = cursor.read_u16::<NetworkEndian>()?;
        let ttl = cursor.read_u32::<NetworkEndian>()?;
        let rdlength = cursor.read_u16::<NetworkEndian>()?.into();
        let rdata_start = cursor.position();
        let rdata = take_slice(cursor, rdlength)?;

        match RecordType::from_code(rtype) {
            RecordType::A => {
                let octets: [u8; 4] = rdata.try_into().map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "A record rdata is not 4 bytes")
                })?;
                Ok(Record::A {
                    name,
                    ttl,
                    address: Ipv4Addr::from(octets),
                })
            }
            RecordType::AAAA => {
                let octets: [u8; 16] = rdata.try_into().map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        "AAAA record rdata is not 16 bytes",
                    )
                })?;
                Ok(Record::AAAA {
                    name,
                    ttl,
                    address: Ipv6Addr::from(octets),
                })
            }
            RecordType::NS => Ok(Record::NS {
                name,
                ttl,
                nameserver: Record::read_rdata_name(&message, rdata_start)?,
            }),
            RecordType::CNAME => Ok(Record::CNAME {
                name,
                ttl,
                canonical: Record::read_rdata_name(&message, rdata_start)?,
            }),
            RecordType::MX => Ok(Record::MX { name, ttl }),
            RecordType::Other(code) => Ok(Record::Other { name, code, ttl }),
        }
    }

    // RDATA names may use compression pointers whose offsets are relative to
    // the start of the whole message, so decoding starts from a cursor over
    // the full buffer positioned at the RDATA
    fn read_rdata_name(message: &Cursor<&[u8]>, rdata_start: u64) -> io::Result<String> {
        let mut cursor = message.clone();
        cursor.set_position(rdata_start);
        read_name(&mut cursor)
    }

    pub fn write_to<B: BufMut>(&self, buf: &mut B) -> io::Result<()> {
        let mut rdata = Vec::new();
        match self {
            Record::A { address, .. } => rdata.extend_from_slice(&address.octets()),
            Record::AAAA { address, .. } => rdata.extend_from_slice(&address.octets()),
            Record::NS { nameserver, .. } => write_name(nameserver, &mut rdata),
            Record::CNAME { canonical, .. } => write_name(canonical, &mut rdata),
            // Opaque rdata was never retained, so none is written
            Record::MX { .. } | Record::Other { .. } => {}
        }

        let rdlength = rdata
            .len()
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "record data too long"))?;

        write_name(self.name(), buf);
        buf.put_u16(self.rtype().code());
        buf.put_u16(CLASS_IN);
        buf.put_u32(self.ttl());
        buf.put_u16(rdlength);
        buf.put_slice(&rdata);

        Ok(())
    }

    pub fn name(&self) -> &str {
        match self {
            Record::A { name, .. } => name,
            Record::AAAA { name, .. } => name,
            Record::NS { name, .. } => name,
            Record::CNAME { name, .. } => name,
            Record::MX { name, .. } => name,
            Record::Other { name, .. } => name,
        }
    }

    pub fn rtype(&self) -> RecordType {
        match self {
            Record::A { .. } => RecordType::A,
            Record::AAAA { .. } => RecordType::AAAA,
            Record::NS { .. } => RecordType::NS,
            Record::CNAME { .. } => RecordType::CNAME,
            Record::MX { .. } => RecordType::MX,
            Record::Other { code, .. } => RecordType::Other(*code),
        }
    }

    pub fn ttl(&self) -> u32 {
        match self {
            Record::A { ttl, .. } => *ttl,
            Record::AAAA { ttl, .. } => *ttl,
            Record::NS { ttl, .. } => *ttl,
            Record::CNAME { ttl, .. } => *ttl,
            Record::MX { ttl, .. } => *ttl,
            Record::Other { ttl, .. } => *ttl,
        }
    }

    /// Textual rdata as printed by `lookup` and `dump`.
    pub fn rdata(&self) -> String {
        match self {
            Record::A { address, .. } => address.to_string(),
            Record::AAAA { address, .. } => address.to_string(),
            Record::NS { nameserver, .. } => nameserver.clone(),
            Record::CNAME { canonical, .. } => canonical.clone(),
            Record::MX { .. } | Record::Other { .. } => "----".to_string(),
        }
    }

    /// The address payload, for records that carry one.
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            Record::A { address, .. } => Some(IpAddr::V4(*address)),
            Record::AAAA { address, .. } => Some(IpAddr::V6(*address)),
            _ => None,
        }
    }

    /// A copy of this record filed under a different owner name, with the
    /// same type, TTL and rdata.
    pub fn renamed(&self, name: &str) -> Record {
        let mut record = self.clone();
        match &mut record {
            Record::A { name: n, .. }
            | Record::AAAA { name: n, .. }
            | Record::NS { name: n, .. }
            | Record::CNAME { name: n, .. }
            | Record::MX { name: n, .. }
            | Record::Other { name: n, .. } => *n = name.to_owned(),
        }
        record
    }

    /// Record identity is (name, type, rdata); TTL does not participate, so
    /// a re-received record with a fresh TTL replaces the old one.
    pub fn same_identity(&self, other: &Record) -> bool {
        self.rtype() == other.rtype()
            && self.name().eq_ignore_ascii_case(other.name())
            && self.rdata() == other.rdata()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn domain_read_from_labels() {
        // F.ISI.ARPA
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           1           |           F           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           3           |           I           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           S           |           I           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           4           |           A           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           R           |           P           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           A           |           0           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        let domain_bytes = [1, b'F', 3, b'I', b'S', b'I', 4, b'A', b'R', b'P', b'A', 0];
        let mut cursor = Cursor::new(&domain_bytes[..]);

        let domain = CompressedDomain::read_from(&mut cursor).unwrap();

        assert_eq!(
            cursor.position() as usize,
            domain_bytes.len(),
            "Expect all bytes to be read"
        );
        assert_eq!(
            domain,
            CompressedDomain {
                labels: vec!["F".to_string(), "ISI".to_string(), "ARPA".to_string()],
                pointer: None,
            }
        );
        assert_eq!("F.ISI.ARPA", domain.uncompress(&cursor).unwrap());
    }

    #[test]
    fn domain_read_from_labels_and_pointer() {
        // Name at offset 5 is "example" followed by a pointer back to "com"
        // at offset 0. The cursor must end exactly two bytes past the
        // pointer, no further.
        let bytes = [
            3, b'c', b'o', b'm', 0, // offset 0: com
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', // offset 5: example
            0b1100_0000, 0, // pointer to offset 0
        ];
        let mut cursor = Cursor::new(&bytes[..]);
        cursor.set_position(5);

        let name = read_name(&mut cursor).unwrap();

        assert_eq!(name, "example.com");
        assert_eq!(
            cursor.position(),
            15,
            "cursor advances exactly 2 bytes over the pointer"
        );
    }

    #[test]
    fn domain_read_pointer_only() {
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // | 1  1|                20                       |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        let domain_bytes = [0b1100_0000, 20];
        let mut cursor = Cursor::new(&domain_bytes[..]);

        let domain = CompressedDomain::read_from(&mut cursor).unwrap();

        assert_eq!(cursor.position(), 2);
        assert_eq!(
            domain,
            CompressedDomain {
                labels: vec![],
                pointer: Some(20),
            }
        );
    }

    #[test]
    fn domain_pointer_loop_is_rejected() {
        // A pointer at offset 0 pointing at itself would expand forever
        let bytes = [0b1100_0000, 0];
        let mut cursor = Cursor::new(&bytes[..]);

        let domain = CompressedDomain::read_from(&mut cursor).unwrap();

        assert!(domain.uncompress(&cursor).is_err());
    }

    #[test]
    fn domain_write_google_com() {
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           6           |           g           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           o           |           o           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           g           |           l           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           e           |           3           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           c           |           o           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        // |           m           |           0           |
        // +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
        let expected_bytes = [6, b'g', b'o', b'o', b'g', b'l', b'e', 3, b'c', b'o', b'm', 0];
        let mut buf = Vec::new();

        write_name("google.com", &mut buf);

        assert_eq!(expected_bytes, &buf[..]);
    }

    #[test]
    fn query_to_bytes_google_com_a() {
        let packet = Packet::query(0x9a9e, "google.com", RecordType::A);

        let bytes = packet.to_bytes().unwrap();

        assert_eq!(
            bytes,
            vec![
                0x9a, 0x9e, // ID
                0x00, 0x00, // flags: QR=0, Opcode=0, TC=0, RD=0
                0x00, 0x01, // QDCOUNT
                0x00, 0x00, // ANCOUNT
                0x00, 0x00, // NSCOUNT
                0x00, 0x00, // ARCOUNT
                0x06, b'g', b'o', b'o', b'g', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00,
                0x00, 0x01, // QTYPE A
                0x00, 0x01, // QCLASS IN
            ]
        );
        assert!(bytes.len() <= MAX_QUERY_SIZE);
    }

    #[test]
    fn packet_from_bytes_response_google_com_a() {
        // Captured response from running `dig +noedns google.com`
        const RESPONSE_GOOGLE_COM: [u8; 124] = [
            0x9a, 0x9e, // ID
            0x81, 0x80, // flags = qr rd ra
            0x00, 0x01, // qdcount
            0x00, 0x06, // ANCOUNT
            0x00, 0x00, // NSCOUNT
            0x00, 0x00, // ARCOUNT
            // Question 1
            0x06, 0x67, 0x6f, 0x6f, 0x67, 0x6c, 0x65, // Label "google"
            0x03, 0x63, 0x6f, 0x6d, // Label "com"
            0x00, // Label end
            0x00, 0x01, // QTYPE
            0x00, 0x01, // QCLASS
            // Answer record 1
            0xc0, 0x0c, // NAME, pointer to offset 12, "google.com"
            0x00, 0x01, // TYPE
            0x00, 0x01, // CLASS
            0x00, 0x00, 0x00, 0x99, // TTL=153
            0x00, 0x04, // rdlength=4
            0x4a, 0x7d, 0x8e, 0x71, // rdata=74.125.142.113
            0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x99, 0x00, 0x04, 0x4a, 0x7d,
            0x8e, 0x8b, 0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x99, 0x00, 0x04,
            0x4a, 0x7d, 0x8e, 0x64, 0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x99,
            0x00, 0x04, 0x4a, 0x7d, 0x8e, 0x65, 0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
            0x00, 0x99, 0x00, 0x04, 0x4a, 0x7d, 0x8e, 0x66, 0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x99, 0x00, 0x04, 0x4a, 0x7d, 0x8e, 0x8a,
        ];

        let packet = Packet::from_bytes(&RESPONSE_GOOGLE_COM[..]).unwrap();

        assert_eq!(packet.id(), 0x9a9e);
        assert!(packet.query_response());
        assert!(!packet.authoritative_answer());
        assert!(!packet.truncated_message());
        assert_eq!(packet.response_code(), 0);

        assert_eq!(
            packet.questions(),
            &[Question {
                domain: String::from("google.com"),
                qtype: RecordType::A,
                qclass: CLASS_IN,
            }]
        );

        let addresses = [
            "74.125.142.113",
            "74.125.142.139",
            "74.125.142.100",
            "74.125.142.101",
            "74.125.142.102",
            "74.125.142.138",
        ];
        let expected: Vec<Record> = addresses
            .iter()
            .map(|addr| Record::A {
                name: String::from("google.com"),
                ttl: 153,
                address: addr.parse().unwrap(),
            })
            .collect();
        assert_eq!(packet.answers(), &expected[..]);
    }

    #[test]
    fn packet_from_bytes_delegation_with_glue() {
        // Hand-built referral: no answers, one NS in authority whose NAME is
        // a pointer to the question name, one glue A in additional whose
        // NAME is a pointer into the NS rdata.
        let bytes = [
            0x00, 0x01, // ID
            0x80, 0x00, // flags = qr
            0x00, 0x01, // QDCOUNT
            0x00, 0x00, // ANCOUNT
            0x00, 0x01, // NSCOUNT
            0x00, 0x01, // ARCOUNT
            // Question, offset 12
            0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00,
            0x00, 0x01, // QTYPE A
            0x00, 0x01, // QCLASS IN
            // Authority record, offset 29
            0xc0, 0x0c, // NAME -> offset 12 "example.com"
            0x00, 0x02, // TYPE NS
            0x00, 0x01, // CLASS
            0x00, 0x02, 0xa3, 0x00, // TTL=172800
            0x00, 0x14, // RDLENGTH=20
            // rdata, offset 41: a.iana-servers.net
            0x01, b'a', 0x0c, b'i', b'a', b'n', b'a', b'-', b's', b'e', b'r', b'v', b'e', b'r',
            b's', 0x03, b'n', b'e', b't', 0x00,
            // Additional record, offset 61
            0xc0, 0x29, // NAME -> offset 41 "a.iana-servers.net"
            0x00, 0x01, // TYPE A
            0x00, 0x01, // CLASS
            0x00, 0x02, 0xa3, 0x00, // TTL=172800
            0x00, 0x04, // RDLENGTH=4
            0xc7, 0x2b, 0x87, 0x35, // 199.43.135.53
        ];

        let packet = Packet::from_bytes(&bytes[..]).unwrap();

        assert!(packet.answers().is_empty());
        assert_eq!(
            packet.authority(),
            &[Record::NS {
                name: "example.com".to_string(),
                ttl: 172800,
                nameserver: "a.iana-servers.net".to_string(),
            }]
        );
        assert_eq!(
            packet.additional(),
            &[Record::A {
                name: "a.iana-servers.net".to_string(),
                ttl: 172800,
                address: "199.43.135.53".parse().unwrap(),
            }]
        );
    }

    #[test]
    fn record_read_unknown_type_keeps_code() {
        // A TXT record (type 16), which this resolver does not interpret
        let bytes = [
            0x03, b'f', b'o', b'o', 0x03, b'c', b'o', b'm', 0x00, // foo.com
            0x00, 0x10, // TYPE TXT
            0x00, 0x01, // CLASS
            0x00, 0x00, 0x00, 0x3c, // TTL=60
            0x00, 0x04, // RDLENGTH
            b'a', b'b', b'c', b'd',
        ];
        let mut cursor = Cursor::new(&bytes[..]);

        let record = Record::read_from(&mut cursor).unwrap();

        assert_eq!(
            record,
            Record::Other {
                name: "foo.com".to_string(),
                code: 16,
                ttl: 60,
            }
        );
        assert_eq!(record.rdata(), "----");
        assert_eq!(
            cursor.position() as usize,
            bytes.len(),
            "opaque rdata is still skipped"
        );
    }

    #[test]
    fn record_read_mx_is_opaque() {
        let bytes = [
            0x03, b'f', b'o', b'o', 0x03, b'c', b'o', b'm', 0x00, // foo.com
            0x00, 0x0f, // TYPE MX
            0x00, 0x01, // CLASS
            0x00, 0x00, 0x0e, 0x10, // TTL=3600
            0x00, 0x02, // RDLENGTH
            0x00, 0x0a, // preference
        ];
        let mut cursor = Cursor::new(&bytes[..]);

        let record = Record::read_from(&mut cursor).unwrap();

        assert_eq!(
            record,
            Record::MX {
                name: "foo.com".to_string(),
                ttl: 3600,
            }
        );
        assert_eq!(record.rdata(), "----");
    }

    #[test]
    fn record_read_aaaa() {
        let mut bytes = vec![
            0x03, b'f', b'o', b'o', 0x03, b'c', b'o', b'm', 0x00, // foo.com
            0x00, 0x1c, // TYPE AAAA
            0x00, 0x01, // CLASS
            0x00, 0x00, 0x0e, 0x10, // TTL=3600
            0x00, 0x10, // RDLENGTH=16
        ];
        bytes.extend_from_slice(&"2001:db8::1".parse::<Ipv6Addr>().unwrap().octets());
        let mut cursor = Cursor::new(&bytes[..]);

        let record = Record::read_from(&mut cursor).unwrap();

        assert_eq!(
            record,
            Record::AAAA {
                name: "foo.com".to_string(),
                ttl: 3600,
                address: "2001:db8::1".parse().unwrap(),
            }
        );
        assert_eq!(record.rdata(), "2001:db8::1");
    }

    #[test]
    fn record_read_truncated_rdata_is_an_error() {
        let bytes = [
            0x00, // root name
            0x00, 0x01, // TYPE A
            0x00, 0x01, // CLASS
            0x00, 0x00, 0x00, 0x3c, // TTL
            0x00, 0x04, // RDLENGTH=4, but only 2 bytes follow
            0x7f, 0x00,
        ];
        let mut cursor = Cursor::new(&bytes[..]);

        assert!(Record::read_from(&mut cursor).is_err());
    }

    #[test]
    fn record_identity_ignores_ttl_and_name_case() {
        let record = Record::A {
            name: "example.com".to_string(),
            ttl: 60,
            address: "93.184.216.34".parse().unwrap(),
        };
        let refreshed = Record::A {
            name: "EXAMPLE.com".to_string(),
            ttl: 3600,
            address: "93.184.216.34".parse().unwrap(),
        };
        let different = Record::A {
            name: "example.com".to_string(),
            ttl: 60,
            address: "93.184.216.35".parse().unwrap(),
        };

        assert!(record.same_identity(&refreshed));
        assert!(!record.same_identity(&different));
    }
}
