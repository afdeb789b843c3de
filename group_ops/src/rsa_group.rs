//! Multiplicative group modulo an RSA modulus.
//!
//! With `n = pq`, `p = 2p' + 1`, `q = 2q' + 1` safe primes, the quadratic residues modulo `n` form
//! a cyclic group of order `p'q'`, which is unknown to anyone without the factorization.

use crate::error::GroupError;
use ark_std::rand::RngCore;
use bignum_arith::{
    modular::{mod_div, mod_inverse, mod_mul, mod_pow, mod_pow_u, multi_mod_pow},
    random::random_non_zero_below,
};
use num::{BigInt, BigUint, Integer, One, Zero};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RsaGroup {
    #[serde_as(as = "DisplayFromStr")]
    n: BigUint,
}

impl RsaGroup {
    pub fn new(n: BigUint) -> Result<Self, GroupError> {
        if n <= BigUint::one() || n.is_even() {
            return Err(GroupError::InvalidModulus);
        }
        Ok(Self { n })
    }

    /// Group for `n = p * q` and the order `p'q'` of its quadratic residue subgroup where
    /// `p = 2p' + 1` and `q = 2q' + 1`
    pub fn from_safe_primes(p: &BigUint, q: &BigUint) -> Result<(Self, BigUint), GroupError> {
        let group = Self::new(p * q)?;
        let order = (p >> 1) * (q >> 1);
        Ok((group, order))
    }

    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// Whether `x` is invertible modulo `n` and in canonical form
    pub fn is_element(&self, x: &BigUint) -> bool {
        x < &self.n && !x.is_zero() && x.gcd(&self.n).is_one()
    }

    pub fn check_element(&self, x: &BigUint) -> Result<(), GroupError> {
        if self.is_element(x) {
            Ok(())
        } else {
            Err(GroupError::ElementOutOfRange)
        }
    }

    pub fn mul(&self, a: &BigUint, b: &BigUint) -> Result<BigUint, GroupError> {
        Ok(mod_mul(a, b, &self.n)?)
    }

    /// `base^exp` for a possibly negative exponent
    pub fn pow(&self, base: &BigUint, exp: &BigInt) -> Result<BigUint, GroupError> {
        Ok(mod_pow(base, exp, &self.n)?)
    }

    pub fn pow_u(&self, base: &BigUint, exp: &BigUint) -> Result<BigUint, GroupError> {
        Ok(mod_pow_u(base, exp, &self.n)?)
    }

    /// Product of powers `bases[i]^exps[i]`
    pub fn multi_pow<'a, I>(&self, pairs: I) -> Result<BigUint, GroupError>
    where
        I: IntoIterator<Item = (&'a BigUint, &'a BigInt)>,
    {
        Ok(multi_mod_pow(pairs, &self.n)?)
    }

    pub fn inverse(&self, a: &BigUint) -> Result<BigUint, GroupError> {
        Ok(mod_inverse(a, &self.n)?)
    }

    pub fn div(&self, a: &BigUint, b: &BigUint) -> Result<BigUint, GroupError> {
        Ok(mod_div(a, b, &self.n)?)
    }

    /// Random quadratic residue, i.e. the square of a random unit
    pub fn random_qr<R: RngCore>(&self, rng: &mut R) -> Result<BigUint, GroupError> {
        loop {
            let x = random_non_zero_below(rng, &self.n)?;
            if x.gcd(&self.n).is_one() {
                return self.mul(&x, &x);
            }
        }
    }

    /// Pedersen style commitment `g^a * h^b`
    pub fn pedersen_commitment(
        &self,
        g: &BigUint,
        a: &BigInt,
        h: &BigUint,
        b: &BigInt,
    ) -> Result<BigUint, GroupError> {
        self.multi_pow([(g, a), (h, b)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use bignum_arith::modular::mod_pow_u;

    // 23 = 2*11 + 1 and 47 = 2*23 + 1
    fn toy_group() -> (RsaGroup, BigUint) {
        RsaGroup::from_safe_primes(&BigUint::from(23u32), &BigUint::from(47u32)).unwrap()
    }

    #[test]
    fn quadratic_residues_have_order_dividing_p_prime_q_prime() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let (group, order) = toy_group();
        assert_eq!(order, BigUint::from(11u32 * 23));
        for _ in 0..50 {
            let qr = group.random_qr(&mut rng).unwrap();
            assert!(group.is_element(&qr));
            assert_eq!(
                mod_pow_u(&qr, &order, group.modulus()).unwrap(),
                BigUint::one()
            );
        }
    }

    #[test]
    fn signed_powers_and_commitments() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let (group, _) = toy_group();
        let g = group.random_qr(&mut rng).unwrap();
        let h = group.random_qr(&mut rng).unwrap();

        let c = group
            .pedersen_commitment(&g, &BigInt::from(5), &h, &BigInt::from(-3))
            .unwrap();
        let expected = group
            .div(
                &group.pow(&g, &BigInt::from(5)).unwrap(),
                &group.pow(&h, &BigInt::from(3)).unwrap(),
            )
            .unwrap();
        assert_eq!(c, expected);

        let inv = group.inverse(&g).unwrap();
        assert_eq!(group.mul(&g, &inv).unwrap(), BigUint::one());
    }

    #[test]
    fn rejects_bad_moduli_and_elements() {
        assert!(matches!(
            RsaGroup::new(BigUint::from(100u32)),
            Err(GroupError::InvalidModulus)
        ));
        assert!(matches!(
            RsaGroup::new(BigUint::one()),
            Err(GroupError::InvalidModulus)
        ));
        let (group, _) = toy_group();
        assert!(!group.is_element(&BigUint::from(0u32)));
        assert!(!group.is_element(&BigUint::from(23u32)));
        assert!(!group.is_element(group.modulus()));
        assert!(group.check_element(&BigUint::from(2u32)).is_ok());
        assert!(matches!(
            group.inverse(&BigUint::from(47u32)),
            Err(GroupError::Arithmetic(_))
        ));
    }

    #[test]
    fn serialization() {
        let (group, _) = toy_group();
        let ser = serde_json::to_string(&group).unwrap();
        assert_eq!(ser, "{\"n\":\"1081\"}");
        assert_eq!(serde_json::from_str::<RsaGroup>(&ser).unwrap(), group);
    }
}
