//! # Similaridade de Strings (Ratcliff/Obershelp)
//!
//! Razão de similaridade em `[0, 1]` usada pelo casamento de templates e
//! pela resolução de sinônimos:
//!
//! ```text
//! ratio = 2·M / T
//!   M = total de caracteres nos blocos casados
//!   T = len(a) + len(b)
//! ```
//!
//! Os blocos são obtidos recursivamente: encontra-se o maior bloco comum
//! entre `a` e `b`, e o processo se repete à esquerda e à direita dele.
//! Em empate de tamanho, vence o bloco que começa mais cedo em `a` (e
//! depois em `b`), o que torna o resultado determinístico.
//!
//! Opera sobre `char`s, não bytes: `"preço"` tem 5 elementos.

use std::collections::HashMap;

/// Similaridade entre duas strings, em `[0, 1]`.
///
/// Duas strings vazias são idênticas (`1.0`).
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = SequenceMatcher::new(&a, &b).matched_len();
    2.0 * matched as f64 / total as f64
}

/// Um bloco comum: `a[a_start..a_start+len] == b[b_start..b_start+len]`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Block {
    a_start: usize,
    b_start: usize,
    len: usize,
}

struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Posições de cada caractere em `b`, em ordem crescente.
    b_positions: HashMap<char, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b_positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b_positions.entry(c).or_default().push(j);
        }
        Self { a, b, b_positions }
    }

    /// Maior bloco comum dentro de `a[a_lo..a_hi]` × `b[b_lo..b_hi]`.
    fn longest_match(&self, a_lo: usize, a_hi: usize, b_lo: usize, b_hi: usize) -> Block {
        let mut best = Block { a_start: a_lo, b_start: b_lo, len: 0 };
        // run_len[j] = tamanho do bloco que termina em a[i-1] e b[j]
        let mut run_len: HashMap<usize, usize> = HashMap::new();

        for i in a_lo..a_hi {
            let mut next_run: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b_positions.get(&self.a[i]) {
                for &j in positions {
                    if j < b_lo {
                        continue;
                    }
                    if j >= b_hi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| run_len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_run.insert(j, k);
                    if k > best.len {
                        best = Block { a_start: i + 1 - k, b_start: j + 1 - k, len: k };
                    }
                }
            }
            run_len = next_run;
        }
        best
    }

    fn matching_blocks(&self) -> Vec<Block> {
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();

        while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
            let block = self.longest_match(a_lo, a_hi, b_lo, b_hi);
            if block.len == 0 {
                continue;
            }
            blocks.push(block);
            if a_lo < block.a_start && b_lo < block.b_start {
                pending.push((a_lo, block.a_start, b_lo, block.b_start));
            }
            let a_end = block.a_start + block.len;
            let b_end = block.b_start + block.len;
            if a_end < a_hi && b_end < b_hi {
                pending.push((a_end, a_hi, b_end, b_hi));
            }
        }

        blocks.sort_by_key(|blk| (blk.a_start, blk.b_start));
        blocks
    }

    fn matched_len(&self) -> usize {
        self.matching_blocks().iter().map(|blk| blk.len).sum()
    }
}
