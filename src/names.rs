//! Markov-chain name generation
//!
//! Each name base is a comma-separated list of sample names. The chain maps
//! a preceding letter to the pseudo-syllables that followed it in the
//! samples; walking it produces new names with the same sound.

use std::collections::HashMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub struct NameBase {
    pub name: &'static str,
    pub min: usize,
    pub max: usize,
    /// Letters allowed to appear doubled
    pub dup: &'static str,
    pub samples: &'static str,
}

pub const NAME_BASES: [NameBase; 3] = [
    NameBase {
        name: "northern",
        min: 5,
        max: 12,
        dup: "",
        samples: "alder,ashford,barrow,blackwater,bourne,calder,darent,derwent,eden,esk,frome,humber,kennet,lune,medway,nene,otter,ouse,rother,severn,stour,swale,tamar,test,trent,tyne,wear,welland,witham,wye",
    },
    NameBase {
        name: "fjordland",
        min: 4,
        max: 10,
        dup: "l",
        samples: "ala,elva,fjalla,glomma,gota,hala,jokla,kalix,klara,lagen,ljusnan,lulea,namsen,nidelva,orkla,pite,rana,skena,tana,torne,umea,vindel,vorma",
    },
    NameBase {
        name: "southern",
        min: 4,
        max: 11,
        dup: "",
        samples: "adda,arno,douro,ebro,garona,loira,mincio,mondego,oglio,panaro,piave,reno,rodano,secchia,segura,sella,tajo,tanaro,tevere,ticino,turia",
    },
];

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

type Chain = HashMap<String, Vec<String>>;

/// Split sample names into pseudo-syllables keyed by the letter before them.
fn calculate_chain(samples: &str) -> Chain {
    let mut chain: Chain = HashMap::new();

    for raw in samples.split(',') {
        let name: Vec<char> = raw.trim().to_lowercase().chars().collect();
        if name.is_empty() {
            continue;
        }

        let mut i: isize = -1;
        while (i as usize) < name.len() || i < 0 {
            let prev = if i >= 0 {
                name[i as usize].to_string()
            } else {
                String::new()
            };
            let mut syllable = String::new();
            let mut has_vowel = false;

            let mut c = (i + 1) as usize;
            while c < name.len() && syllable.chars().count() < 5 {
                let that = name[c];
                let next = name.get(c + 1).copied();
                syllable.push(that);
                if syllable == " " || syllable == "-" {
                    break;
                }
                let Some(next) = next else { break };
                if next == ' ' || next == '-' {
                    break;
                }
                if is_vowel(that) {
                    has_vowel = true;
                }
                // keep common diphthongs together
                if (that == 'y' && next == 'e')
                    || (that == 'o' && next == 'o')
                    || (that == 'e' && next == 'e')
                    || (that == 'a' && next == 'e')
                    || (that == 'c' && next == 'h')
                {
                    c += 1;
                    continue;
                }
                if is_vowel(that) && that == next {
                    break;
                }
                if has_vowel && name.get(c + 2).copied().map_or(false, is_vowel) {
                    break;
                }
                c += 1;
            }

            let step = syllable.chars().count().max(1) as isize;
            chain.entry(prev).or_default().push(syllable);
            i += step;
            if i as usize >= name.len() {
                break;
            }
        }
    }
    chain
}

pub struct NameGenerator {
    chains: Vec<Chain>,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator {
    pub fn new() -> Self {
        let chains = NAME_BASES
            .iter()
            .map(|base| calculate_chain(base.samples))
            .collect();
        Self { chains }
    }

    /// Generate a name in the style of a culture's base.
    pub fn culture_name(&self, rng: &mut ChaCha8Rng, culture: usize) -> String {
        self.base_name(rng, culture % NAME_BASES.len())
    }

    pub fn base_name(&self, rng: &mut ChaCha8Rng, base: usize) -> String {
        let rules = &NAME_BASES[base];
        let chain = &self.chains[base];
        let start = &chain[""];

        let mut word = String::new();
        let mut cur = pick(rng, start).clone();
        for _ in 0..20 {
            if cur.is_empty() {
                // end of word reached
                if word.chars().count() >= rules.min {
                    break;
                }
                // too short, restart from a fresh opening syllable
                word.clear();
                cur = pick(rng, start).clone();
            } else if word.chars().count() + cur.chars().count() > rules.max {
                if word.chars().count() < rules.min {
                    word.push_str(&cur);
                }
                break;
            }
            word.push_str(&cur);
            let v = cur
                .chars()
                .last()
                .and_then(|l| chain.get(&l.to_string()))
                .unwrap_or(start);
            cur = pick(rng, v).clone();
        }

        let name = polish(&word, rules.dup);
        if name.chars().count() < 2 {
            // chain walked itself into a corner, fall back to a sample
            let samples: Vec<&str> = rules.samples.split(',').collect();
            return capitalize(samples[rng.gen_range(0..samples.len())]);
        }
        name
    }
}

fn pick<'a>(rng: &mut ChaCha8Rng, v: &'a [String]) -> &'a String {
    &v[rng.gen_range(0..v.len())]
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Clean up a raw chain walk: drop dangling separators, collapse forbidden
/// doubles, capitalize word starts.
fn polish(word: &str, dup: &str) -> String {
    let mut w: Vec<char> = word.chars().collect();
    while matches!(w.last(), Some('\'') | Some(' ') | Some('-')) {
        w.pop();
    }

    let mut out = String::new();
    for i in 0..w.len() {
        let c = w[i];
        let next = w.get(i + 1).copied();
        let prev_in = i.checked_sub(1).and_then(|p| w.get(p)).copied();
        if next == Some(c) && !dup.contains(c) {
            continue;
        }
        if out.is_empty() {
            out.extend(c.to_uppercase());
            continue;
        }
        let tail = out.chars().last();
        if tail == Some('-') && c == ' ' {
            continue;
        }
        if tail == Some(' ') || tail == Some('-') {
            out.extend(c.to_uppercase());
            continue;
        }
        if c == 'a' && next == Some('e') {
            continue;
        }
        if i + 1 < w.len()
            && !is_vowel(c)
            && prev_in.map_or(false, |p| !is_vowel(p))
            && next.map_or(false, |n| !is_vowel(n))
        {
            continue; // consonant wedged between two consonants
        }
        if i + 2 < w.len() && next == Some(c) && w.get(i + 2).copied() == Some(c) {
            continue;
        }
        out.push(c);
    }

    // join multi-part names when any part degenerated to one letter
    if out.split(' ').any(|part| part.chars().count() < 2) {
        let parts: Vec<String> = out
            .split(' ')
            .enumerate()
            .map(|(i, p)| if i == 0 { p.to_string() } else { p.to_lowercase() })
            .collect();
        return parts.concat();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_names_are_capitalized_and_bounded() {
        let names = NameGenerator::new();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for base in 0..NAME_BASES.len() {
            for _ in 0..50 {
                let name = names.base_name(&mut rng, base);
                assert!(name.chars().count() >= 2, "too short: {:?}", name);
                assert!(
                    name.chars().next().unwrap().is_uppercase(),
                    "not capitalized: {:?}",
                    name
                );
            }
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let names = NameGenerator::new();
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(names.culture_name(&mut a, 1), names.culture_name(&mut b, 1));
        }
    }

    #[test]
    fn test_forbidden_doubles_collapse() {
        assert_eq!(polish("aary", ""), "Ary");
        assert_eq!(polish("tor-", ""), "Tor");
    }
}
