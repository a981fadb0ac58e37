//! Répartition d'une suite de points en N lignes parallèles
//!
//! - scie (`09_72`..`09_79`): 0, 1, .., N-1, 0, 1, ..
//! - vague (`09_82`..`09_89`): 0, 1, .., N-1, N-1, .., 1, 0, 0, 1, ..
//!
//! L'ordre d'arrivée est conservé dans chaque ligne.

/// Méthode de répartition multi-lignes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiLineMethod {
    Saw,
    Wave,
}

impl MultiLineMethod {
    /// Indice de la ligne recevant le i-ème point (0-based)
    ///
    /// `lines` est ramené à 1 au minimum.
    pub fn bucket_index(self, i: usize, lines: usize) -> usize {
        let n = lines.max(1);
        match self {
            Self::Saw => i % n,
            Self::Wave => {
                let k = i % (2 * n);
                if k < n {
                    k
                } else {
                    2 * n - k - 1
                }
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saw => "saw",
            Self::Wave => "wave",
        }
    }
}

/// Répartiteur incrémental, alimenté point par point
#[derive(Debug, Clone)]
pub struct Distributor<T> {
    method: MultiLineMethod,
    buckets: Vec<Vec<T>>,
    cursor: usize,
}

impl<T> Distributor<T> {
    pub fn new(method: MultiLineMethod, lines: usize) -> Self {
        let n = lines.max(1);
        Self {
            method,
            buckets: (0..n).map(|_| Vec::new()).collect(),
            cursor: 0,
        }
    }

    pub fn method(&self) -> MultiLineMethod {
        self.method
    }

    pub fn lines(&self) -> usize {
        self.buckets.len()
    }

    /// Nombre de points reçus
    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn push(&mut self, item: T) {
        let idx = self.method.bucket_index(self.cursor, self.buckets.len());
        self.buckets[idx].push(item);
        self.cursor += 1;
    }

    pub fn into_buckets(self) -> Vec<Vec<T>> {
        self.buckets
    }
}

impl<T> Extend<T> for Distributor<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

/// Répartit une suite complète en `lines` sous-suites
pub fn distribute<T>(items: Vec<T>, method: MultiLineMethod, lines: usize) -> Vec<Vec<T>> {
    let mut distributor = Distributor::new(method, lines);
    distributor.extend(items);
    distributor.into_buckets()
}

/// Séquence des indices de ligne pour `count` points
pub fn assignment(method: MultiLineMethod, lines: usize, count: usize) -> Vec<usize> {
    (0..count).map(|i| method.bucket_index(i, lines)).collect()
}
