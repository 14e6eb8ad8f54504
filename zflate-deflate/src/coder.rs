//! Huffman encoding of DEFLATE blocks.
//!
//! The engine tallies literals and matches into [`HuffmanCoder`]; when a
//! block is flushed the coder builds length-limited Huffman trees from the
//! tallied frequencies, compares the encoded size of a dynamic block, a
//! static block and a stored block, and writes the cheapest into its pending
//! [`BitWriter`].
//!
//! Trees are built with a binary heap over `(frequency << 8) | depth`, so
//! ties between equal frequencies favour the shallower subtree. Lengths over
//! the limit are redistributed with the overflow correction used by zlib.

use crate::config::TALLY_BUFFER_SIZE;
use crate::tables::{
    BIT_LENGTH_ORDER, BITLEN_CODES, DIST_CODES, END_OF_BLOCK, LITLEN_CODES, STATIC_DIST_CODES,
    STATIC_DIST_LENGTHS, STATIC_LITLEN_CODES, STATIC_LITLEN_LENGTHS, distance_to_code,
    length_to_code, reverse_bits,
};
use log::{debug, trace};
use zflate_core::BitWriter;
use zflate_core::error::{Result, ZflateError};

const REPEAT_3_TO_6: usize = 16;
const REPEAT_3_TO_10: usize = 17;
const REPEAT_11_TO_138: usize = 18;

/// Block type field values.
const STORED_BLOCK: u32 = 0;
const STATIC_TREES: u32 = 1;
const DYN_TREES: u32 = 2;

/// One Huffman alphabet being encoded.
#[derive(Debug, Clone)]
struct Tree {
    freqs: Vec<u16>,
    codes: Vec<u16>,
    lengths: Vec<u8>,
    /// Number of leaves at each bit length, indexed by `length - 1`.
    bl_counts: Vec<i32>,
    min_codes: usize,
    /// Symbols transmitted for this tree (highest used symbol + 1, at least
    /// `min_codes`).
    num_codes: usize,
    max_length: usize,
}

/// Run-length coding of a tree's code lengths with symbols 16, 17, 18.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthRun {
    /// `count` copies of `len`, each sent as itself.
    Plain { len: u8, count: usize },
    /// Symbol 16, 17 or 18 with its extra bits.
    Repeat { symbol: usize, extra: u32, bits: u32 },
}

impl Tree {
    fn new(elems: usize, min_codes: usize, max_length: usize) -> Self {
        Self {
            freqs: vec![0; elems],
            codes: vec![0; elems],
            lengths: vec![0; elems],
            bl_counts: vec![0; max_length],
            min_codes,
            num_codes: 0,
            max_length,
        }
    }

    fn reset(&mut self) {
        self.freqs.fill(0);
        self.codes.fill(0);
        self.lengths.fill(0);
    }

    #[inline]
    fn write_symbol(&self, symbol: usize, out: &mut BitWriter) {
        out.write_bits(u32::from(self.codes[symbol]), u32::from(self.lengths[symbol]));
    }

    fn set_static_codes(&mut self, codes: &[u16], lengths: &[u8]) {
        let n = self.codes.len();
        self.codes.copy_from_slice(&codes[..n]);
        self.lengths.copy_from_slice(&lengths[..n]);
    }

    /// Assign canonical codes from `lengths`, stored bit-reversed.
    fn build_codes(&mut self) {
        let mut counts = vec![0u32; self.max_length + 1];
        for &len in &self.lengths[..self.num_codes] {
            counts[len as usize] += 1;
        }
        counts[0] = 0;

        let mut next_code = vec![0u32; self.max_length + 1];
        let mut code = 0u32;
        for bits in 1..=self.max_length {
            code = (code + counts[bits - 1]) << 1;
            next_code[bits] = code;
        }

        for symbol in 0..self.num_codes {
            let len = self.lengths[symbol] as usize;
            if len > 0 {
                self.codes[symbol] = reverse_bits(next_code[len] as u16, len as u32);
                next_code[len] += 1;
            }
        }
    }

    fn build_tree(&mut self) -> Result<()> {
        let num_symbols = self.freqs.len();

        // Min-heap of leaves ordered by frequency.
        let mut heap = vec![0usize; num_symbols];
        let mut heap_len = 0;
        let mut max_code = 0;
        for (n, &freq) in self.freqs.iter().enumerate() {
            if freq != 0 {
                let mut pos = heap_len;
                heap_len += 1;
                while pos > 0 {
                    let ppos = (pos - 1) / 2;
                    if self.freqs[heap[ppos]] <= freq {
                        break;
                    }
                    heap[pos] = heap[ppos];
                    pos = ppos;
                }
                heap[pos] = n;
                max_code = n;
            }
        }

        // A lone symbol still needs a 1-bit code for the decoder to see it,
        // so force a second leaf.
        while heap_len < 2 {
            let node = if max_code < 2 {
                max_code += 1;
                max_code
            } else {
                0
            };
            heap[heap_len] = node;
            heap_len += 1;
        }

        self.num_codes = (max_code + 1).max(self.min_codes);

        let num_leafs = heap_len;
        let mut childs = vec![0i32; 4 * heap_len - 2];
        let mut values = vec![0u32; 2 * heap_len - 1];
        let mut num_nodes = num_leafs;
        for i in 0..heap_len {
            let node = heap[i];
            childs[2 * i] = node as i32;
            childs[2 * i + 1] = -1;
            values[i] = u32::from(self.freqs[node]) << 8;
            heap[i] = i;
        }

        // Combine the two least frequent nodes until one remains.
        loop {
            let first = heap[0];
            heap_len -= 1;
            let last = heap[heap_len];

            let ppos = sift_hole(&mut heap, &values, heap_len);
            let path = sift_up(&mut heap, &values, ppos, values[last]);
            heap[path] = last;

            let second = heap[0];
            let node = num_nodes;
            num_nodes += 1;
            childs[2 * node] = first as i32;
            childs[2 * node + 1] = second as i32;
            let min_depth = (values[first] & 0xff).min(values[second] & 0xff);
            values[node] = values[first] + values[second] - min_depth + 1;

            let ppos = sift_hole(&mut heap, &values, heap_len);
            let path = sift_up(&mut heap, &values, ppos, values[node]);
            heap[path] = node;

            if heap_len <= 1 {
                break;
            }
        }

        if heap[0] != childs.len() / 2 - 1 {
            return Err(ZflateError::HeapInvariant);
        }

        self.build_length(&childs);
        Ok(())
    }

    /// Derive code lengths from the tree in `childs`, limiting them to
    /// `max_length`.
    fn build_length(&mut self, childs: &[i32]) {
        self.lengths.fill(0);
        let num_nodes = childs.len() / 2;
        let num_leafs = (num_nodes + 1) / 2;
        let mut overflow: i32 = 0;
        self.bl_counts.fill(0);

        // Optimal lengths first, clamped at the limit.
        let mut lengths = vec![0usize; num_nodes];
        for i in (0..num_nodes).rev() {
            if childs[2 * i + 1] != -1 {
                let mut bit_length = lengths[i] + 1;
                if bit_length > self.max_length {
                    bit_length = self.max_length;
                    overflow += 1;
                }
                lengths[childs[2 * i] as usize] = bit_length;
                lengths[childs[2 * i + 1] as usize] = bit_length;
            } else {
                let bit_length = lengths[i];
                self.bl_counts[bit_length - 1] += 1;
                self.lengths[childs[2 * i] as usize] = bit_length as u8;
            }
        }

        if overflow == 0 {
            return;
        }

        let max = self.max_length;
        let mut incr_bit_len = max - 1;
        loop {
            // Find the first bit length which could increase.
            loop {
                incr_bit_len -= 1;
                if self.bl_counts[incr_bit_len] != 0 {
                    break;
                }
            }

            // Move this node one down and remove a corresponding number of
            // overflow nodes.
            loop {
                self.bl_counts[incr_bit_len] -= 1;
                incr_bit_len += 1;
                self.bl_counts[incr_bit_len] += 1;
                overflow -= 1 << (max - 1 - incr_bit_len);
                if overflow <= 0 || incr_bit_len >= max - 1 {
                    break;
                }
            }

            if overflow <= 0 {
                break;
            }
        }

        // Undo any overshoot.
        self.bl_counts[max - 1] += overflow;
        self.bl_counts[max - 2] -= overflow;

        // Reassign lengths to leaves in increasing frequency order, which is
        // the order internal nodes were created in.
        let mut node_ptr = 2 * num_leafs;
        for bits in (1..=max).rev() {
            let mut n = self.bl_counts[bits - 1];
            while n > 0 {
                let child_ptr = 2 * childs[node_ptr] as usize;
                node_ptr += 1;
                if childs[child_ptr + 1] == -1 {
                    self.lengths[childs[child_ptr] as usize] = bits as u8;
                    n -= 1;
                }
            }
        }
    }

    fn encoded_length(&self) -> usize {
        self.freqs
            .iter()
            .zip(&self.lengths)
            .map(|(&f, &l)| usize::from(f) * usize::from(l))
            .sum()
    }

    /// Split the transmitted code lengths into runs.
    fn length_runs(&self) -> Vec<LengthRun> {
        let mut runs = Vec::new();
        let mut cur_len: Option<u8> = None;
        let mut i = 0;

        while i < self.num_codes {
            let next_len = self.lengths[i];
            let mut count = 1;
            let max_count = if next_len == 0 { 138 } else { 6 };
            if next_len != 0 && cur_len != Some(next_len) {
                runs.push(LengthRun::Plain {
                    len: next_len,
                    count: 1,
                });
                count = 0;
            }
            cur_len = Some(next_len);
            i += 1;

            while i < self.num_codes && self.lengths[i] == next_len {
                i += 1;
                count += 1;
                if count >= max_count {
                    break;
                }
            }

            if count < 3 {
                if count > 0 {
                    runs.push(LengthRun::Plain {
                        len: next_len,
                        count,
                    });
                }
            } else if next_len != 0 {
                runs.push(LengthRun::Repeat {
                    symbol: REPEAT_3_TO_6,
                    extra: count as u32 - 3,
                    bits: 2,
                });
            } else if count <= 10 {
                runs.push(LengthRun::Repeat {
                    symbol: REPEAT_3_TO_10,
                    extra: count as u32 - 3,
                    bits: 3,
                });
            } else {
                runs.push(LengthRun::Repeat {
                    symbol: REPEAT_11_TO_138,
                    extra: count as u32 - 11,
                    bits: 7,
                });
            }
        }

        runs
    }

    /// Add this tree's length symbols to the bit-length tree frequencies.
    fn calc_bl_freq(&self, bl_tree: &mut Tree) {
        for run in self.length_runs() {
            match run {
                LengthRun::Plain { len, count } => bl_tree.freqs[len as usize] += count as u16,
                LengthRun::Repeat { symbol, .. } => bl_tree.freqs[symbol] += 1,
            }
        }
    }

    /// Send this tree's code lengths with the bit-length code.
    fn write_tree(&self, bl_tree: &Tree, out: &mut BitWriter) {
        for run in self.length_runs() {
            match run {
                LengthRun::Plain { len, count } => {
                    for _ in 0..count {
                        bl_tree.write_symbol(len as usize, out);
                    }
                }
                LengthRun::Repeat {
                    symbol,
                    extra,
                    bits,
                } => {
                    bl_tree.write_symbol(symbol, out);
                    out.write_bits(extra, bits);
                }
            }
        }
    }
}

/// Move the hole at the heap root down to a leaf, promoting the smaller
/// child each step. Returns the final hole position.
fn sift_hole(heap: &mut [usize], values: &[u32], heap_len: usize) -> usize {
    let mut ppos = 0;
    let mut path = 1;
    while path < heap_len {
        if path + 1 < heap_len && values[heap[path]] > values[heap[path + 1]] {
            path += 1;
        }
        heap[ppos] = heap[path];
        ppos = path;
        path = path * 2 + 1;
    }
    ppos
}

/// Move the hole at `pos` up while its parent is larger than `value`.
/// Returns where `value` belongs.
fn sift_up(heap: &mut [usize], values: &[u32], mut pos: usize, value: u32) -> usize {
    while pos > 0 {
        let parent = (pos - 1) / 2;
        if values[heap[parent]] <= value {
            break;
        }
        heap[pos] = heap[parent];
        pos = parent;
    }
    pos
}

/// Block encoder and pending output of the compressor.
#[derive(Debug)]
pub struct HuffmanCoder {
    pending: BitWriter,
    literal_tree: Tree,
    dist_tree: Tree,
    bl_tree: Tree,
    /// Distance of each tallied record, 0 for a literal.
    d_buf: Vec<u16>,
    /// Literal byte, or match length minus 3.
    l_buf: Vec<u8>,
    last_lit: usize,
    extra_bits: usize,
}

impl HuffmanCoder {
    /// Create a coder with an empty pending buffer.
    pub fn new() -> Self {
        Self {
            pending: BitWriter::with_capacity(crate::config::PENDING_BUF_SIZE),
            literal_tree: Tree::new(LITLEN_CODES, 257, 15),
            dist_tree: Tree::new(DIST_CODES, 1, 15),
            bl_tree: Tree::new(BITLEN_CODES, 4, 7),
            d_buf: vec![0; TALLY_BUFFER_SIZE],
            l_buf: vec![0; TALLY_BUFFER_SIZE],
            last_lit: 0,
            extra_bits: 0,
        }
    }

    /// Pending compressed output.
    pub fn pending(&self) -> &BitWriter {
        &self.pending
    }

    /// Pending compressed output, for header and trailer writes.
    pub fn pending_mut(&mut self) -> &mut BitWriter {
        &mut self.pending
    }

    /// Forget the tallies of the current block.
    pub fn reset(&mut self) {
        self.last_lit = 0;
        self.extra_bits = 0;
        self.literal_tree.reset();
        self.dist_tree.reset();
        self.bl_tree.reset();
    }

    /// Whether the tally buffer is full and the block must be flushed.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.last_lit >= TALLY_BUFFER_SIZE
    }

    /// Record one literal. Returns `true` when the block is full.
    #[inline]
    pub fn tally_lit(&mut self, literal: u8) -> bool {
        self.d_buf[self.last_lit] = 0;
        self.l_buf[self.last_lit] = literal;
        self.last_lit += 1;
        self.literal_tree.freqs[literal as usize] += 1;
        self.is_full()
    }

    /// Record one match. Returns `true` when the block is full.
    pub fn tally_dist(&mut self, distance: usize, length: usize) -> bool {
        self.d_buf[self.last_lit] = distance as u16;
        self.l_buf[self.last_lit] = (length - 3) as u8;
        self.last_lit += 1;

        let (lc, lbits, _) = length_to_code(length);
        self.literal_tree.freqs[lc as usize] += 1;
        self.extra_bits += lbits as usize;

        let (dc, dbits, _) = distance_to_code(distance);
        self.dist_tree.freqs[dc as usize] += 1;
        self.extra_bits += dbits as usize;

        self.is_full()
    }

    /// Write the dynamic block header: counts, bit-length code, both trees.
    fn send_all_trees(&mut self, bl_tree_codes: usize) {
        self.bl_tree.num_codes = BITLEN_CODES;
        self.bl_tree.build_codes();
        self.literal_tree.build_codes();
        self.dist_tree.build_codes();

        let out = &mut self.pending;
        out.write_bits(self.literal_tree.num_codes as u32 - 257, 5);
        out.write_bits(self.dist_tree.num_codes as u32 - 1, 5);
        out.write_bits(bl_tree_codes as u32 - 4, 4);
        for &symbol in &BIT_LENGTH_ORDER[..bl_tree_codes] {
            out.write_bits(u32::from(self.bl_tree.lengths[symbol]), 3);
        }
        self.literal_tree.write_tree(&self.bl_tree, out);
        self.dist_tree.write_tree(&self.bl_tree, out);
    }

    /// Encode the tallied records and the end-of-block code.
    fn compress_block(&mut self) {
        let out = &mut self.pending;
        for i in 0..self.last_lit {
            let litlen = self.l_buf[i];
            let dist = self.d_buf[i];
            if dist != 0 {
                let (lc, lbits, lextra) = length_to_code(litlen as usize + 3);
                self.literal_tree.write_symbol(lc as usize, out);
                out.write_bits(lextra, lbits);

                let (dc, dbits, dextra) = distance_to_code(dist as usize);
                self.dist_tree.write_symbol(dc as usize, out);
                out.write_bits(dextra, dbits);
            } else {
                self.literal_tree.write_symbol(litlen as usize, out);
            }
        }
        self.literal_tree
            .write_symbol(END_OF_BLOCK as usize, &mut self.pending);
    }

    /// Write `stored` as a stored block and reset the tallies.
    pub fn flush_stored_block(&mut self, stored: &[u8], last_block: bool) {
        trace!("stored block: {} bytes, last={last_block}", stored.len());
        let out = &mut self.pending;
        out.write_bits((STORED_BLOCK << 1) + u32::from(last_block), 3);
        out.align_to_byte();
        out.write_short(stored.len() as u16);
        out.write_short(!(stored.len() as u16));
        out.write_block(stored);
        self.reset();
    }

    /// Emit the tallied block in whichever form is smallest.
    ///
    /// `stored` is the uncompressed input of the block when it is still
    /// available in the window; without it a stored block is not an option.
    pub fn flush_block(&mut self, stored: Option<&[u8]>, last_block: bool) -> Result<()> {
        self.literal_tree.freqs[END_OF_BLOCK as usize] += 1;

        self.literal_tree.build_tree()?;
        self.dist_tree.build_tree()?;

        self.literal_tree.calc_bl_freq(&mut self.bl_tree);
        self.dist_tree.calc_bl_freq(&mut self.bl_tree);
        self.bl_tree.build_tree()?;

        let mut bl_tree_codes = 4;
        for i in (bl_tree_codes + 1..BITLEN_CODES).rev() {
            if self.bl_tree.lengths[BIT_LENGTH_ORDER[i]] > 0 {
                bl_tree_codes = i + 1;
                break;
            }
        }

        let mut opt_len = 14
            + bl_tree_codes * 3
            + self.bl_tree.encoded_length()
            + self.literal_tree.encoded_length()
            + self.dist_tree.encoded_length()
            + self.extra_bits;

        let mut static_len = self.extra_bits;
        for (freq, &len) in self.literal_tree.freqs.iter().zip(&STATIC_LITLEN_LENGTHS) {
            static_len += usize::from(*freq) * usize::from(len);
        }
        for (freq, &len) in self.dist_tree.freqs.iter().zip(&STATIC_DIST_LENGTHS) {
            static_len += usize::from(*freq) * usize::from(len);
        }

        if opt_len >= static_len {
            opt_len = static_len;
        }

        match stored {
            Some(stored) if stored.len() + 4 < opt_len >> 3 => {
                debug!(
                    "block of {} bytes stored (coded estimate {} bytes)",
                    stored.len(),
                    opt_len >> 3
                );
                self.flush_stored_block(stored, last_block);
                return Ok(());
            }
            _ => {}
        }

        if opt_len == static_len {
            debug!(
                "static block: {} records, {} bits, last={last_block}",
                self.last_lit, static_len
            );
            self.pending
                .write_bits((STATIC_TREES << 1) + u32::from(last_block), 3);
            self.literal_tree
                .set_static_codes(&STATIC_LITLEN_CODES, &STATIC_LITLEN_LENGTHS);
            self.dist_tree
                .set_static_codes(&STATIC_DIST_CODES, &STATIC_DIST_LENGTHS);
        } else {
            debug!(
                "dynamic block: {} records, {} bits, last={last_block}",
                self.last_lit, opt_len
            );
            self.pending
                .write_bits((DYN_TREES << 1) + u32::from(last_block), 3);
            self.send_all_trees(bl_tree_codes);
        }

        self.compress_block();
        self.reset();
        Ok(())
    }
}

impl Default for HuffmanCoder {
    fn default() -> Self {
        Self::new()
    }
}
